use crate::config::Settings;
use crate::domain::order::ActorId;
use crate::domain::ports::Authorizer;
use std::collections::HashSet;

/// Administrator capability backed by a fixed set of actor ids.
#[derive(Debug, Default, Clone)]
pub struct StaticAdminRoster {
    admins: HashSet<ActorId>,
}

impl StaticAdminRoster {
    pub fn new(admins: impl IntoIterator<Item = ActorId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.admins.iter().copied().map(ActorId))
    }
}

impl Authorizer for StaticAdminRoster {
    fn has_admin_capability(&self, actor: ActorId) -> bool {
        self.admins.contains(&actor)
    }
}
