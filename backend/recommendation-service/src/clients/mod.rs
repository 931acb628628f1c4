pub mod content;
pub mod graph;
pub mod users;

pub use content::{ContentApi, ContentServiceClient};
pub use graph::{GraphApi, GraphServiceClient};
pub use users::{UserDirectory, UserStoreClient};

#[cfg(test)]
pub use content::MockContentApi;
#[cfg(test)]
pub use graph::MockGraphApi;
#[cfg(test)]
pub use users::MockUserDirectory;

pub const GRAPH_SERVICE: &str = "graph-service";
pub const CONTENT_SERVICE: &str = "content-service";
pub const USER_SERVICE: &str = "user-service";

/// Connection-level failures where the request never produced a response.
pub(crate) fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
