// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn transient_classification() {
    assert!(BackendError::Transient("503".into()).is_transient());
    assert!(BackendError::Timeout(Duration::from_secs(120)).is_transient());
    assert!(!BackendError::NotFound("x".into()).is_transient());
    assert!(!BackendError::PermissionDenied("x".into()).is_transient());
}

#[test]
fn tolerance_predicates() {
    assert!(BackendError::NotFound("x".into()).is_not_found());
    assert!(BackendError::PermissionDenied("x".into()).is_permission_denied());
    assert!(!BackendError::Invalid("x".into()).is_not_found());
}
