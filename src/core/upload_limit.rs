use poem::{
    error::SizedLimitError,
    web::headers::{ContentLength, HeaderMapExt},
    Body, Endpoint, Middleware, Request, Result,
};
use tokio::io::AsyncReadExt;

/// Room for the text fields that travel next to the photo in one form.
pub const FORM_OVERHEAD: usize = 64 * 1024;

/// Caps the size of multipart bodies. A declared `Content-Length` above the
/// limit is rejected up front with 413; a body without one is cut off at the
/// limit, which leaves an incomplete form that fails to parse.
pub struct UploadLimit {
    max_size: usize,
}

impl UploadLimit {
    pub fn new(max_upload_size: usize) -> Self {
        Self {
            max_size: max_upload_size.saturating_add(FORM_OVERHEAD),
        }
    }
}

impl<E: Endpoint> Middleware<E> for UploadLimit {
    type Output = UploadLimitEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        UploadLimitEndpoint {
            inner: ep,
            max_size: self.max_size,
        }
    }
}

pub struct UploadLimitEndpoint<E> {
    inner: E,
    max_size: usize,
}

impl<E: Endpoint> Endpoint for UploadLimitEndpoint<E> {
    type Output = E::Output;

    async fn call(&self, mut req: Request) -> Result<Self::Output> {
        let is_multipart = req
            .content_type()
            .is_some_and(|ct| ct.starts_with("multipart/"));
        if !is_multipart {
            return self.inner.call(req).await;
        }

        match req.headers().typed_get::<ContentLength>() {
            Some(ContentLength(len)) if len > self.max_size as u64 => {
                return Err(SizedLimitError::PayloadTooLarge.into());
            }
            Some(_) => {}
            None => {
                let body = req.take_body().into_async_read();
                req.set_body(Body::from_async_read(body.take(self.max_size as u64)));
            }
        }
        self.inner.call(req).await
    }
}
