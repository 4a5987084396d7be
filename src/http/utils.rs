use reqwest::StatusCode;

use super::request::Response;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_code} status code")]
pub struct ServerError {
    pub status_code: u16,
}

impl ServerError {
    /// Anything outside 2xx is an error.
    pub fn check(status: StatusCode) -> Result<(), Self> {
        if status.is_success() {
            return Ok(());
        }
        Err(Self {
            status_code: status.as_u16(),
        })
    }
}

pub fn check_status(res: &Response) -> Result<(), ServerError> {
    ServerError::check(res.status())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_2xx_passes() {
        assert!(ServerError::check(StatusCode::OK).is_ok());
        assert!(ServerError::check(StatusCode::NO_CONTENT).is_ok());
        assert_eq!(
            ServerError::check(StatusCode::UNAUTHORIZED),
            Err(ServerError { status_code: 401 })
        );
        assert_eq!(
            check_status(&Response::new(StatusCode::NOT_FOUND, Vec::new())),
            Err(ServerError { status_code: 404 })
        );
    }
}
