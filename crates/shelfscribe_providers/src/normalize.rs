//! The canonical `{work, editions[], authors[]}` shape every provider normalizes into
//! (§4.C, §9 "Provider normalization").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edition {
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedWork {
    pub work: Work,
    pub editions: Vec<Edition>,
    pub authors: Vec<Author>,
}
