pub mod events;
pub mod orchestration;
pub mod server_list;
