use serde::Serialize;
use serde_json::{Map, Value};

pub const QUERY: &str = r#"
  query TestBusinessAbilities {
    business {
      abilities {
        manage
      }
    }
  }
"#;

#[derive(Debug, Serialize)]
pub struct GraphRequest<'a> {
    pub query: &'a str,
    pub variables: Map<String, Value>,
}

impl<'a> GraphRequest<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            variables: Map::new(),
        }
    }
}

/// JSON body for one business abilities request.
pub fn request_body() -> Result<String, serde_json::Error> {
    serde_json::to_string(&GraphRequest::new(QUERY))
}
