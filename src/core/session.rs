use crate::domain::model::{ServiceRecord, VisitorContext};
use crate::utils::error::{HandoutError, Result};

/// One visitor's pass at the front desk: the answers, the retrieved
/// candidates and the ids staff removed while reviewing them.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoutSession {
    context: VisitorContext,
    candidates: Vec<ServiceRecord>,
    removed: Vec<u32>,
}

impl HandoutSession {
    pub fn new(context: VisitorContext, candidates: Vec<ServiceRecord>) -> Self {
        Self {
            context,
            candidates,
            removed: Vec::new(),
        }
    }

    pub fn context(&self) -> &VisitorContext {
        &self.context
    }

    pub fn candidates(&self) -> &[ServiceRecord] {
        &self.candidates
    }

    /// Returns false when `id` is not a candidate or was already removed.
    pub fn remove(&mut self, id: u32) -> bool {
        let is_candidate = self.candidates.iter().any(|svc| svc.id == id);
        if !is_candidate || self.removed.contains(&id) {
            return false;
        }
        self.removed.push(id);
        true
    }

    /// Puts a removed candidate back.
    pub fn restore(&mut self, id: u32) -> bool {
        let before = self.removed.len();
        self.removed.retain(|removed| *removed != id);
        self.removed.len() != before
    }

    /// Kept candidates, in retrieval order.
    pub fn kept(&self) -> Vec<ServiceRecord> {
        self.candidates
            .iter()
            .filter(|svc| !self.removed.contains(&svc.id))
            .cloned()
            .collect()
    }

    /// Removed ids, in retrieval order.
    pub fn removed_ids(&self) -> Vec<u32> {
        self.candidates
            .iter()
            .map(|svc| svc.id)
            .filter(|id| self.removed.contains(id))
            .collect()
    }

    /// Kept services, or `NoServicesKept` when staff removed all of them.
    pub fn confirm(&self) -> Result<Vec<ServiceRecord>> {
        let kept = self.kept();
        if kept.is_empty() {
            return Err(HandoutError::NoServicesKept);
        }
        Ok(kept)
    }
}
