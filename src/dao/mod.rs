/// Database model definitions.
pub mod models;
/// Room, question and player persistence.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
