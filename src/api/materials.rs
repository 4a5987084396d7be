use serde::de::DeserializeOwned;

use crate::http::{
    request::{Body, Part, RequestDescriptor},
    Client, Error,
};

/// A file to attach to a course.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
}

pub async fn list_by_course<T: DeserializeOwned>(
    client: &Client,
    course_id: &str,
) -> Result<T, Error> {
    client
        .execute_json(RequestDescriptor::get(format!("/courses/{course_id}/materials")))
        .await
}

pub fn upload_request(course_id: &str, upload: Upload) -> RequestDescriptor {
    let Upload {
        file_name,
        mime,
        bytes,
        description,
    } = upload;
    let parts = vec![
        Part::file("file", file_name, mime, bytes),
        Part::text("description", description.unwrap_or_default()),
    ];
    RequestDescriptor::post(format!("/courses/{course_id}/materials"))
        .with_body(Body::Multipart(parts))
}

pub async fn upload<T: DeserializeOwned>(
    client: &Client,
    course_id: &str,
    upload: Upload,
) -> Result<T, Error> {
    client.execute_json(upload_request(course_id, upload)).await
}

pub async fn delete(client: &Client, material_id: &str) -> Result<(), Error> {
    client
        .execute_empty(RequestDescriptor::delete(format!("/materials/{material_id}")))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::PartValue;

    #[test]
    fn missing_description_is_sent_empty() {
        let request = upload_request(
            "42",
            Upload {
                file_name: "syllabus.pdf".into(),
                mime: Some("application/pdf".into()),
                bytes: b"%PDF".to_vec(),
                description: None,
            },
        );
        assert_eq!(request.path(), "/courses/42/materials");
        let Body::Multipart(parts) = request.body() else {
            panic!("expected multipart body");
        };
        assert_eq!(parts[1], Part::text("description", ""));
        assert!(matches!(
            &parts[0].value,
            PartValue::File { file_name, .. } if file_name == "syllabus.pdf"
        ));
    }
}
