use crate::http::{Method, Request, Response};
use crate::schema::{ErrorBody, ViewsResponse, INCREMENT_PATH, VIEWS_PATH};
use crate::storage::ViewStorage;

/// Dispatch one request against the store.
pub fn route(req: &Request, store: &dyn ViewStorage) -> Response {
    match (req.path.as_str(), &req.method) {
        (VIEWS_PATH, Method::Get) => views_reply(store.views()),
        (INCREMENT_PATH, Method::Post) => views_reply(store.increment_views()),
        (VIEWS_PATH, _) | (INCREMENT_PATH, _) => {
            Response::json(405, &ErrorBody::new("Method Not Allowed"))
        }
        _ => Response::json(404, &ErrorBody::new("Not Found")),
    }
}

fn views_reply(result: crate::Result<u64>) -> Response {
    match result {
        Ok(views) => Response::json(200, &ViewsResponse { views }),
        Err(e) => {
            log::error!("counter store failed: {}", e);
            internal_error(&e.to_string())
        }
    }
}

pub fn internal_error(message: &str) -> Response {
    Response::json(500, &ErrorBody::new(message))
}

pub fn bad_request(message: &str) -> Response {
    Response::json(400, &ErrorBody::new(message))
}

pub fn too_large() -> Response {
    Response::json(413, &ErrorBody::new("Payload Too Large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorage;

    fn req(method: Method, path: &str) -> Request {
        Request {
            method,
            path: path.to_string(),
            content_length: 0,
        }
    }

    fn views_of(resp: &Response) -> u64 {
        serde_json::from_slice::<ViewsResponse>(&resp.body).unwrap().views
    }

    #[test]
    fn increment_then_read_on_fresh_counter() {
        let store = MemStorage::new();
        let bumped = route(&req(Method::Post, INCREMENT_PATH), &store);
        assert_eq!(bumped.status, 200);
        assert_eq!(views_of(&bumped), 1);

        let read = route(&req(Method::Get, VIEWS_PATH), &store);
        assert_eq!(read.status, 200);
        assert_eq!(views_of(&read), 1);
    }

    #[test]
    fn reading_does_not_increment() {
        let store = MemStorage::new();
        for _ in 0..3 {
            assert_eq!(views_of(&route(&req(Method::Get, VIEWS_PATH), &store)), 0);
        }
    }

    #[test]
    fn wrong_method_and_unknown_path() {
        let store = MemStorage::new();
        assert_eq!(route(&req(Method::Get, INCREMENT_PATH), &store).status, 405);
        assert_eq!(route(&req(Method::Post, VIEWS_PATH), &store).status, 405);
        assert_eq!(
            route(&req(Method::Other("DELETE".into()), VIEWS_PATH), &store).status,
            405
        );
        assert_eq!(route(&req(Method::Get, "/"), &store).status, 404);
        assert_eq!(store.views().unwrap(), 0);
    }
}
