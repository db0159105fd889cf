// ABOUTME: Phantom-typed resource identifiers for compile-time type safety.
// ABOUTME: Prevents passing a certificate ARN where a load balancer ARN is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum LoadBalancerMarker {}
pub enum ListenerMarker {}
pub enum CertificateMarker {}
pub enum StackMarker {}

/// An Amazon Resource Name (or any opaque resource identifier) tagged with
/// the kind of resource it names.
#[must_use = "ARNs reference resources and should not be ignored"]
pub struct Arn<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Arn<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// The trailing resource segment, e.g. `my-alb/50dc6c495c0c9188` for an ALB.
    pub fn resource(&self) -> &str {
        self.value
            .split_once(":loadbalancer/")
            .or_else(|| self.value.split_once(":certificate/"))
            .or_else(|| self.value.split_once(":listener/"))
            .map(|(_, rest)| rest)
            .unwrap_or(&self.value)
    }
}

// Manual trait implementations that don't require T to implement the trait.

impl<T> std::fmt::Debug for Arn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Arn").field(&self.value).finish()
    }
}

impl<T> Clone for Arn<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Arn<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Arn<T> {}

impl<T> PartialOrd for Arn<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Arn<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Arn<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Arn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Arn<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Arn<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type LoadBalancerArn = Arn<LoadBalancerMarker>;
pub type ListenerArn = Arn<ListenerMarker>;
pub type CertificateArn = Arn<CertificateMarker>;
pub type StackId = Arn<StackMarker>;
