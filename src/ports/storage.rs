/// Durable string storage, the native stand-in for `localStorage`.
pub trait KeyValueStore: Send + Sync {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}
