pub mod bridge;
pub mod key_codec;
pub mod manager;
pub mod permission;
pub mod sync;
pub mod worker;
