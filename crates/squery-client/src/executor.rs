//! Command execution seam

use async_trait::async_trait;
use squery_core::{split_response, unmarshal_response, Request, Unmarshal};
use std::sync::Arc;

use crate::error::Result;

/// Anything that can run one command and return its raw reply
///
/// The subscriber and command catalogues built on top of the client only
/// depend on this trait.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `request`, returning the reply line (if the command has one)
    async fn execute_raw(&self, request: &Request) -> Result<Option<String>>;
}

#[async_trait]
impl<T: Executor + ?Sized> Executor for Arc<T> {
    async fn execute_raw(&self, request: &Request) -> Result<Option<String>> {
        (**self).execute_raw(request).await
    }
}

/// Typed helpers available on every [`Executor`]
#[async_trait]
pub trait ExecutorExt: Executor {
    /// Run `request` and decode the reply into `target`
    async fn execute<T>(&self, request: &Request, target: &mut T) -> Result<()>
    where
        T: Unmarshal + Send + ?Sized,
    {
        let raw = self.execute_raw(request).await?;
        let objects = raw.as_deref().map(split_response).unwrap_or_default();
        unmarshal_response(&objects, target)?;
        Ok(())
    }

    /// Run `request` and decode the reply into a new `T`
    async fn query<T>(&self, request: &Request) -> Result<T>
    where
        T: Unmarshal + Default + Send,
    {
        let mut target = T::default();
        self.execute(request, &mut target).await?;
        Ok(target)
    }
}

impl<X: Executor + ?Sized> ExecutorExt for X {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use squery_core::DecodeError;

    squery_core::record! {
        struct Version {
            version: String => "version",
            build: u64 => "build",
        }
    }

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl Executor for Fixed {
        async fn execute_raw(&self, _request: &Request) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    #[tokio::test]
    async fn test_query_decodes_reply() {
        let exec = Fixed(Some("version=3.13.7 build=1655727713"));
        let v: Version = exec.query(&Request::new("version")).await.unwrap();
        assert_eq!(v.version, "3.13.7");
        assert_eq!(v.build, 1655727713);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let exec = Arc::new(Fixed(None));
        let err = exec.query::<Version>(&Request::new("version")).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(DecodeError::EmptyResponse)));

        let list: Vec<Version> = exec.query(&Request::new("version")).await.unwrap();
        assert!(list.is_empty());

        exec.execute(&Request::new("quit"), &mut ()).await.unwrap();
    }
}
