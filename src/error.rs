use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::{
    Error as DatabaseError, ErrorKind as DatabaseErrorKind, WriteFailure,
    TRANSIENT_TRANSACTION_ERROR,
};
use serde::{Serialize, Serializer};

use crate::campaign::CampaignUrn;
use crate::class::ClassUrn;
use crate::user::UserId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    #[serde(serialize_with = "display")]
    InvalidForm(#[derivative(PartialEq = "ignore")] UrlencodedError),
    #[serde(serialize_with = "display")]
    InvalidQuery(#[derivative(PartialEq = "ignore")] QueryPayloadError),
    InvalidUrn {
        value: String,
    },
    InvalidUserId {
        value: String,
    },
    InvalidRunningState {
        value: String,
    },
    InvalidPrivacyState {
        value: String,
    },
    InvalidClassList {
        value: String,
    },
    InvalidDate {
        value: String,
    },
    InvalidPromptResponse {
        prompt_id: String,
    },

    // 401
    RequesterNotProvided,
    RequesterNotFound {
        user_id: UserId,
    },

    // 403
    InsufficientCampaignPermissions {
        campaign_urn: CampaignUrn,
        user_id: UserId,
    },
    XmlModificationNotAllowed {
        campaign_urn: CampaignUrn,
        user_id: UserId,
    },
    RequesterNotAdmin {
        user_id: UserId,
    },
    RequesterDisabled {
        user_id: UserId,
    },
    RequesterIsNewAccount {
        user_id: UserId,
    },

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_urn: CampaignUrn,
    },
    ClassNotFound {
        class_urn: ClassUrn,
    },

    // 409
    ConcurrentModificationDetected,

    // 500
    UnknownClassRole {
        class_urn: ClassUrn,
        user_id: UserId,
        class_role: String,
    },
    InvalidConfiguration {
        key: &'static str,
        value: String,
    },
    ExistentialState(String),
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidForm(_) => "E4001002",
            Error::InvalidQuery(_) => "E4001003",
            Error::InvalidUrn { .. } => "E4001004",
            Error::InvalidUserId { .. } => "E4001005",
            Error::InvalidRunningState { .. } => "E4001006",
            Error::InvalidPrivacyState { .. } => "E4001007",
            Error::InvalidClassList { .. } => "E4001008",
            Error::InvalidDate { .. } => "E4001009",
            Error::InvalidPromptResponse { .. } => "E4001010",
            Error::RequesterNotProvided => "E4011000",
            Error::RequesterNotFound { .. } => "E4011001",
            Error::InsufficientCampaignPermissions { .. } => "E4031000",
            Error::XmlModificationNotAllowed { .. } => "E4031001",
            Error::RequesterNotAdmin { .. } => "E4031002",
            Error::RequesterDisabled { .. } => "E4031003",
            Error::RequesterIsNewAccount { .. } => "E4031004",
            Error::PathNotFound => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::ClassNotFound { .. } => "E4041002",
            Error::ConcurrentModificationDetected => "E4091000",
            Error::UnknownClassRole { .. } => "E5001000",
            Error::InvalidConfiguration { .. } => "E5001001",
            Error::ExistentialState(_) => "E5001002",
            Error::FailedDatabaseCall(_) => "E5001003",
            Error::FailedToSerializeToBson(_) => "E5001004",
            Error::IoError(_) => "E5001005",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidForm(_) => "The given form could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::InvalidUrn { .. } => "The given urn is not valid",
            Error::InvalidUserId { .. } => "The given user id is not valid",
            Error::InvalidRunningState { .. } => "The given running state is not valid",
            Error::InvalidPrivacyState { .. } => "The given privacy state is not valid",
            Error::InvalidClassList { .. } => "The given class list does not contain any class",
            Error::InvalidDate { .. } => "The given date could not be parsed",
            Error::InvalidPromptResponse { .. } => "The given prompt response is not valid",
            Error::RequesterNotProvided => "The request does not identify a user",
            Error::RequesterNotFound { .. } => "The requesting user does not exist",
            Error::InsufficientCampaignPermissions { .. } => {
                "The requesting user has insufficient permissions to modify this campaign"
            }
            Error::XmlModificationNotAllowed { .. } => {
                "The requesting user is only an author and responses exist for this campaign"
            }
            Error::RequesterNotAdmin { .. } => "The requesting user is not an admin",
            Error::RequesterDisabled { .. } => "The requesting user is disabled",
            Error::RequesterIsNewAccount { .. } => {
                "The requesting user must change their password before continuing"
            }
            Error::PathNotFound => "The requested path was not found",
            Error::CampaignNotFound { .. } => "The requested campaign was not found",
            Error::ClassNotFound { .. } => "The requested class was not found",
            Error::ConcurrentModificationDetected => {
                "The server detected a concurrent modification"
            }
            Error::UnknownClassRole { .. } => "The server found a class member with an unknown role",
            Error::InvalidConfiguration { .. } => "The server configuration is not valid",
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidForm(_) => StatusCode::BAD_REQUEST,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::InvalidUrn { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidUserId { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidRunningState { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidPrivacyState { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidClassList { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidDate { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidPromptResponse { .. } => StatusCode::BAD_REQUEST,
            Error::RequesterNotProvided => StatusCode::UNAUTHORIZED,
            Error::RequesterNotFound { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientCampaignPermissions { .. } => StatusCode::FORBIDDEN,
            Error::XmlModificationNotAllowed { .. } => StatusCode::FORBIDDEN,
            Error::RequesterNotAdmin { .. } => StatusCode::FORBIDDEN,
            Error::RequesterDisabled { .. } => StatusCode::FORBIDDEN,
            Error::RequesterIsNewAccount { .. } => StatusCode::FORBIDDEN,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ClassNotFound { .. } => StatusCode::NOT_FOUND,
            Error::ConcurrentModificationDetected => StatusCode::CONFLICT,
            Error::UnknownClassRole { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfiguration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        HttpResponse::build(self.status_code()).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        // write conflicts between concurrent transactions are labeled transient
        if error.contains_label(TRANSIENT_TRANSACTION_ERROR) {
            return Error::ConcurrentModificationDetected;
        }

        // a concurrent upsert lost the race on a unique association index
        if write_error_code(&error).map_or(false, is_duplicate_key) {
            return Error::ConcurrentModificationDetected;
        }

        Error::FailedDatabaseCall(error)
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(code: i32) -> bool {
    code == DUPLICATE_KEY
}

fn write_error_code(error: &DatabaseError) -> Option<i32> {
    match &*error.kind {
        DatabaseErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
        DatabaseErrorKind::Command(command_error) => Some(command_error.code),
        _ => None,
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidForm(err) => Some(err),
            Error::InvalidQuery(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
