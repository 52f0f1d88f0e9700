use actix_web::dev::Payload;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::database::Database;
use crate::error::Error;

use super::{manager, User, UserId};

/// Carries the login id of the user a request is made on behalf of. The
/// gateway in front of the server verifies credentials before setting it.
pub const REQUESTER_HEADER: &str = "X-Ohmage-User";

/// The authenticated user making a request.
#[derive(Clone, Debug)]
pub struct Requester(pub User);

impl Requester {
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl FromRequest for Requester {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Requester, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(REQUESTER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let db = req.app_data::<Data<Box<dyn Database>>>().cloned();

        Box::pin(async move {
            let user_id: UserId = user_id.ok_or(Error::RequesterNotProvided)?.parse()?;
            let db = db.ok_or_else(|| {
                Error::ExistentialState("no database registered with the app".into())
            })?;

            let user = manager::authenticate(&***db, &user_id).await?;

            Ok(Requester(user))
        })
    }
}
