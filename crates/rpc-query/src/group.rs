//! Procedure groups
//!
//! An [`RpcGroup`] is the client-side contract: the ordered set of procedures
//! sharing one transport. Tags are unique within a group.
//!
//! ```rust,ignore
//! let users = RpcGroup::make([
//!     ClassifiedRpc::from(Rpc::new("get")),
//!     as_mutation(Rpc::new("updateName")),
//! ])?;
//! let group = RpcGroup::new().merge("users", users)?;
//! // Contains: users.get, users.updateName
//! ```

use crate::{ClassifiedRpc, ClientError, ClientResult};

/// Ordered collection of classified procedures with unique tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcGroup {
    procedures: Vec<ClassifiedRpc>,
}

impl RpcGroup {
    /// An empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a group from procedures, rejecting duplicate tags.
    pub fn make<I, P>(procedures: I) -> ClientResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<ClassifiedRpc>,
    {
        procedures
            .into_iter()
            .try_fold(Self::new(), |group, procedure| group.add(procedure))
    }

    // Caller guarantees the tags are unique.
    pub(crate) fn from_unique(procedures: Vec<ClassifiedRpc>) -> Self {
        Self { procedures }
    }

    /// Add one procedure.
    pub fn add(mut self, procedure: impl Into<ClassifiedRpc>) -> ClientResult<Self> {
        let procedure = procedure.into();
        if self.get(procedure.tag()).is_some() {
            return Err(ClientError::DuplicateTag {
                tag: procedure.tag().to_string(),
            });
        }
        self.procedures.push(procedure);
        Ok(self)
    }

    /// Add every procedure of `other` under `namespace`.
    ///
    /// An empty namespace merges the tags unchanged.
    pub fn merge(self, namespace: &str, other: RpcGroup) -> ClientResult<Self> {
        other.procedures.into_iter().try_fold(self, |group, procedure| {
            let tag = if namespace.is_empty() {
                procedure.tag().to_string()
            } else {
                format!("{}.{}", namespace, procedure.tag())
            };
            group.add(procedure.retag(tag))
        })
    }

    /// Look up a procedure by tag.
    pub fn get(&self, tag: &str) -> Option<&ClassifiedRpc> {
        self.procedures.iter().find(|p| p.tag() == tag)
    }

    /// Procedures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedRpc> {
        self.procedures.iter()
    }

    /// All tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.procedures.iter().map(|p| p.tag().to_string()).collect();
        tags.sort();
        tags
    }

    /// Number of procedures.
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// True when the group has no procedures.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl<'a> IntoIterator for &'a RpcGroup {
    type Item = &'a ClassifiedRpc;
    type IntoIter = std::slice::Iter<'a, ClassifiedRpc>;

    fn into_iter(self) -> Self::IntoIter {
        self.procedures.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProcedureKind, Rpc, as_mutation};

    #[test]
    fn test_duplicate_tag_rejected() {
        let result = RpcGroup::make([Rpc::new("users.get"), Rpc::new("users.get")]);
        assert_eq!(
            result.unwrap_err(),
            ClientError::DuplicateTag {
                tag: "users.get".into()
            }
        );
    }

    #[test]
    fn test_merge_prefixes_and_keeps_kind() {
        let users = RpcGroup::make([
            ClassifiedRpc::from(Rpc::new("get")),
            as_mutation(Rpc::new("updateName")),
        ])
        .unwrap();
        let group = RpcGroup::new()
            .add(Rpc::new("health"))
            .unwrap()
            .merge("users", users)
            .unwrap();

        assert_eq!(group.tags(), ["health", "users.get", "users.updateName"]);
        assert_eq!(
            group.get("users.updateName").map(|p| p.kind),
            Some(ProcedureKind::Mutation)
        );
    }
}
