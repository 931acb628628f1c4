use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One edge in the caller's social graph, as listed by the graph service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Followee {
    #[serde(rename = "subjectId")]
    pub subject_id: String,
}

/// Wire shape of the graph service followee listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolloweesResponse {
    pub user: Vec<Followee>,
}

/// A post as served by the content service. Everything beyond the author
/// passes through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub author: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A signed-up user as stored in the external user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub subject_id: String,
    pub name: String,
    pub email: String,
}

/// Claims carried by a verified OpenID identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}
