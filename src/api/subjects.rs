use serde::{de::DeserializeOwned, Serialize};

use super::Page;
use crate::http::{request::RequestDescriptor, Client, Error};

/// Large enough to fill a subject picker in one call.
pub const DEFAULT_LIMIT: u32 = 1000;

pub fn list_request(page: u32, limit: Option<u32>) -> RequestDescriptor {
    RequestDescriptor::get("/subjects")
        .with_query("page", page)
        .with_query("limit", limit.unwrap_or(DEFAULT_LIMIT))
}

pub async fn list<T: DeserializeOwned>(client: &Client, page: Page) -> Result<T, Error> {
    client
        .execute_json(list_request(page.page, Some(page.limit)))
        .await
}

pub async fn list_all<T: DeserializeOwned>(client: &Client) -> Result<T, Error> {
    client.execute_json(list_request(1, None)).await
}

pub async fn get<T: DeserializeOwned>(client: &Client, subject_id: &str) -> Result<T, Error> {
    client
        .execute_json(RequestDescriptor::get(format!("/subjects/{subject_id}")))
        .await
}

pub async fn create<B, T>(client: &Client, subject: &B) -> Result<T, Error>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    client
        .send_json(RequestDescriptor::post("/subjects"), subject)
        .await
}

pub async fn update<B, T>(client: &Client, subject_id: &str, subject: &B) -> Result<T, Error>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    client
        .send_json(
            RequestDescriptor::put(format!("/subjects/{subject_id}")),
            subject,
        )
        .await
}

pub async fn delete(client: &Client, subject_id: &str) -> Result<(), Error> {
    client
        .execute_empty(RequestDescriptor::delete(format!("/subjects/{subject_id}")))
        .await
}
