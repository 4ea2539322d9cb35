//! Member endpoints.

use crate::client::{ApiClient, ApiRequest};
use crate::error::Result;
use crate::models::{Member, MemberId, NewMember, Role};

/// Typed facade over `/members/`.
#[derive(Clone)]
pub struct MembersService {
    client: ApiClient,
}

impl MembersService {
    /// Service over `client`.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `GET /members/`.
    ///
    /// # Errors
    /// Propagates client and decode errors.
    pub async fn list(&self) -> Result<Vec<Member>> {
        self.client
            .execute(ApiRequest::get("/members/"))
            .await?
            .data("GET /members/")
    }

    /// `POST /members/create/` (sends the email invite).
    ///
    /// # Errors
    /// Propagates client and decode errors.
    pub async fn create(&self, member: &NewMember) -> Result<Member> {
        let request = ApiRequest::post("/members/create/").json(member)?;
        self.client
            .execute(request)
            .await?
            .json("POST /members/create/")
    }

    /// `PUT /members/{id}/change-role/{role}/`; repeating it with the same role is a no-op.
    ///
    /// # Errors
    /// Propagates client errors.
    pub async fn update_role(&self, id: MemberId, role: Role) -> Result<()> {
        self.client
            .execute(ApiRequest::put(format!("/members/{id}/change-role/{role}/")))
            .await?;
        Ok(())
    }

    /// `DELETE /members/{id}/delete/`.
    ///
    /// # Errors
    /// Propagates client errors.
    pub async fn remove(&self, id: MemberId) -> Result<()> {
        self.client
            .execute(ApiRequest::delete(format!("/members/{id}/delete/")))
            .await?;
        Ok(())
    }
}
