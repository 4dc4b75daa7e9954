pub mod diagnosis;
pub mod interview;
pub mod investigations;
