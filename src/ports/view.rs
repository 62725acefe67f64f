/// The rendered task list of an open application window.
pub trait TaskListView: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn reload<'a>(&'a self) -> Self::Fut<'a>;
    fn contains(&self, task_id: &str) -> bool;
    fn set_highlight(&self, task_id: &str, highlighted: bool);
}
