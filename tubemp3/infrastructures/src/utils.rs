pub mod aliases {
    pub type Fallible<T> = ::anyhow::Result<T>;

    pub type MaybeOwnedString = ::std::borrow::Cow<'static, str>;
    pub type MaybeOwnedPath = ::std::borrow::Cow<'static, ::std::path::Path>;

    pub type BoxedStream<T> =
        ::std::pin::Pin<::std::boxed::Box<dyn ::futures::Stream<Item = T> + ::core::marker::Send>>;
}

pub mod extensions {
    use ::use_cases::models::descriptors::Step;
    use ::use_cases::models::errors::StepError;

    pub trait ResultExt<T> {
        /// Blames `step` for the error, keeping its whole source chain in the message.
        fn or_fail(self, step: Step, status: Option<u16>) -> Result<T, StepError>;
    }

    impl<T, E> ResultExt<T> for Result<T, E>
    where
        E: ::std::error::Error + ::core::marker::Send + ::core::marker::Sync + 'static,
    {
        fn or_fail(self, step: Step, status: Option<u16>) -> Result<T, StepError> {
            self.map_err(|err| StepError::new(step, status, format!("{:#}", ::anyhow::Error::new(err))))
        }
    }
}

#[cfg(test)]
pub mod testing {
    use ::axum::response::IntoResponse as _;

    use crate::utils::aliases::Fallible;

    /// A response the [`serve`] router hands out, one per request.
    #[derive(Debug, Clone)]
    pub struct CannedResponse {
        pub status: u16,
        pub content_type: Option<&'static str>,
        pub body: Vec<u8>,
    }

    impl CannedResponse {
        pub fn json(body: &str) -> Self {
            Self::with(200, Some("application/json"), body.as_bytes())
        }

        pub fn with(status: u16, content_type: Option<&'static str>, body: &[u8]) -> Self {
            Self { status, content_type, body: body.to_vec() }
        }
    }

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: String,
        pub path: String,
        pub headers: ::axum::http::HeaderMap,
        pub body: Vec<u8>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|value| value.to_str().ok())
        }

        pub fn json(&self) -> ::serde_json::Value {
            ::serde_json::from_slice(&self.body).unwrap()
        }
    }

    struct CannedServer {
        responses: ::std::sync::Mutex<::std::collections::VecDeque<CannedResponse>>,
        requests: ::tokio::sync::mpsc::UnboundedSender<RecordedRequest>,
    }

    /// Serves `responses` in order on a loopback port, whatever the route, and
    /// reports every request it receives. Returns the `http://host:port` base URL.
    pub async fn serve(
        responses: Vec<CannedResponse>,
    ) -> Fallible<(String, ::tokio::sync::mpsc::UnboundedReceiver<RecordedRequest>)> {
        let listener = ::tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        let (requests_tx, requests_rx) = ::tokio::sync::mpsc::unbounded_channel();

        let server = ::std::sync::Arc::new(CannedServer {
            responses: ::std::sync::Mutex::new(responses.into()),
            requests: requests_tx,
        });

        let router = ::axum::Router::new().fallback(respond).with_state(server);

        ::tokio::spawn(async move { ::axum::serve(listener, router).await });

        Ok((format!("http://{}", address), requests_rx))
    }

    async fn respond(
        ::axum::extract::State(server): ::axum::extract::State<::std::sync::Arc<CannedServer>>,
        method: ::axum::http::Method, uri: ::axum::http::Uri, headers: ::axum::http::HeaderMap,
        body: ::axum::body::Bytes,
    ) -> ::axum::response::Response {
        let _ = server.requests.send(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_owned(),
            headers,
            body: body.to_vec(),
        });

        let Some(canned) = server.responses.lock().unwrap().pop_front() else {
            return ::axum::http::StatusCode::SERVICE_UNAVAILABLE.into_response();
        };

        let status = ::axum::http::StatusCode::from_u16(canned.status).unwrap();
        let mut response = (status, canned.body).into_response();

        match canned.content_type {
            Some(content_type) => {
                response.headers_mut().insert(
                    ::axum::http::header::CONTENT_TYPE,
                    ::axum::http::HeaderValue::from_static(content_type),
                );
            },
            None => {
                response.headers_mut().remove(::axum::http::header::CONTENT_TYPE);
            },
        }

        response
    }
}
