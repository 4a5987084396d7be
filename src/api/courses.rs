use serde::{de::DeserializeOwned, Serialize};

use super::Page;
use crate::http::{request::RequestDescriptor, Client, Error};

/// The backend pages from zero and calls the limit `size`.
pub fn list_request(page: Page) -> RequestDescriptor {
    RequestDescriptor::get("/courses")
        .with_query("page", page.page.saturating_sub(1))
        .with_query("size", page.limit)
}

pub async fn list<T: DeserializeOwned>(client: &Client, page: Page) -> Result<T, Error> {
    client.execute_json(list_request(page)).await
}

pub async fn get<T: DeserializeOwned>(client: &Client, course_id: &str) -> Result<T, Error> {
    client
        .execute_json(RequestDescriptor::get(format!("/courses/{course_id}")))
        .await
}

pub async fn create<B, T>(client: &Client, course: &B) -> Result<T, Error>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    client
        .send_json(RequestDescriptor::post("/courses"), course)
        .await
}

pub async fn update<B, T>(client: &Client, course_id: &str, course: &B) -> Result<T, Error>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    client
        .send_json(RequestDescriptor::put(format!("/courses/{course_id}")), course)
        .await
}

pub async fn delete(client: &Client, course_id: &str) -> Result<(), Error> {
    client
        .execute_empty(RequestDescriptor::delete(format!("/courses/{course_id}")))
        .await
}
