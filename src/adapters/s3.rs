use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                // checkpoint 文件不存在時要能跟其他錯誤區分
                GetObjectError::NoSuchKey(_) => EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("s3://{}/{} does not exist", self.bucket, path),
                )),
                err => EtlError::StorageError {
                    message: format!(
                        "Failed to read s3://{}/{}: {}",
                        self.bucket,
                        path,
                        err.message().unwrap_or("unknown error")
                    ),
                },
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| EtlError::StorageError {
                message: format!("Failed to collect S3 data: {}", e),
            })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                EtlError::StorageError {
                    message: format!(
                        "Failed to write s3://{}/{}: {} ({})",
                        self.bucket,
                        path,
                        err.message().unwrap_or("unknown error"),
                        err.code().unwrap_or("no code")
                    ),
                }
            })?;

        Ok(())
    }

    fn location(&self, path: &str) -> String {
        format!("s3://{}/{}", self.bucket, path)
    }
}
