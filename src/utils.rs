use serde::{Deserialize, Serialize};

/// The body of a request that changed something and has nothing to return.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SuccessBody {
    pub result: String,
}

impl SuccessBody {
    pub fn new() -> SuccessBody {
        SuccessBody {
            result: "success".into(),
        }
    }
}
