pub mod action_reader;
pub mod order_writer;
