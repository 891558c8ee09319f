//! Formatting of ARNs and resource URIs whose shape is fixed up front.
//!
//! Late-bound values (attributes of resources created in the same template)
//! go through [`crate::resource::ResourceRef`] instead.

/// ARN of an S3 bucket known by name.
pub fn s3_bucket(name: &str) -> String {
    format!("arn:aws:s3:::{name}")
}

/// ARN pattern matching every object inside an S3 bucket.
pub fn s3_objects(name: &str) -> String {
    format!("arn:aws:s3:::{name}/*")
}

/// `s3://` URL of an object key inside a bucket.
pub fn s3_url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// URI of a tagged image in an ECR repository.
pub fn ecr_image(account: &str, region: &str, repository: &str, tag: &str) -> String {
    format!("{account}.dkr.ecr.{region}.amazonaws.com/{repository}:{tag}")
}
