// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Admission review requests and responses.
//!
//! These mirror the request/response pair an API server exchanges with a
//! validating webhook, minus the transport. Whoever receives the request
//! decodes it into an [`AdmissionRequest`], hands it to a [`Reviewer`], and
//! encodes the returned [`AdmissionResponse`].

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use slog::{info, o, warn, Logger};
use thiserror::Error;
use vm_spec_types::VirtualMachine;

use crate::error::AdmissionError;
use crate::Warnings;

const CODE_BAD_REQUEST: u16 = 400;
const CODE_FORBIDDEN: u16 = 403;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
        };

        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Identifies this request; echoed back in the response.
    pub uid: String,

    pub operation: Operation,

    /// The object as it would be after the operation. Absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<VirtualMachine>,

    /// The object as it was before the operation. Only present for updates
    /// and deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<VirtualMachine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Status {
    pub code: u16,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Warnings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl AdmissionResponse {
    fn allowed(uid: String, warnings: Warnings) -> Self {
        Self { uid, allowed: true, warnings, status: None }
    }

    fn denied(uid: String, code: u16, message: String) -> Self {
        Self {
            uid,
            allowed: false,
            warnings: Warnings::new(),
            status: Some(Status { code, message }),
        }
    }
}

#[derive(Debug, Error)]
enum ReviewError {
    #[error("{0} request is missing {1}")]
    MissingObject(Operation, &'static str),

    #[error(transparent)]
    Rejected(#[from] AdmissionError),
}

impl ReviewError {
    fn code(&self) -> u16 {
        match self {
            Self::MissingObject(..) => CODE_BAD_REQUEST,
            Self::Rejected(_) => CODE_FORBIDDEN,
        }
    }
}

/// Answers admission requests for VirtualMachine objects.
pub struct Reviewer {
    log: Logger,
}

impl Reviewer {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }

    pub fn review(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let log = self.log.new(o!(
            "uid" => request.uid.clone(),
            "operation" => request.operation.to_string()
        ));

        match evaluate(request) {
            Ok(warnings) => {
                info!(log, "admitted request");
                AdmissionResponse::allowed(request.uid.clone(), warnings)
            }
            Err(e) => {
                warn!(log, "denied request"; "reason" => %e);
                AdmissionResponse::denied(
                    request.uid.clone(),
                    e.code(),
                    e.to_string(),
                )
            }
        }
    }
}

fn evaluate(request: &AdmissionRequest) -> Result<Warnings, ReviewError> {
    let op = request.operation;
    let object = || {
        request
            .object
            .as_ref()
            .map(|vm| &vm.spec)
            .ok_or(ReviewError::MissingObject(op, "object"))
    };

    let warnings = match op {
        Operation::Create => crate::validate_create(object()?)?,
        Operation::Update => {
            let old = request
                .old_object
                .as_ref()
                .map(|vm| &vm.spec)
                .ok_or(ReviewError::MissingObject(op, "oldObject"))?;
            crate::validate_update(old, object()?)?
        }
        Operation::Delete => match &request.old_object {
            Some(vm) => crate::validate_delete(&vm.spec)?,
            None => Warnings::new(),
        },
        Operation::Connect => Warnings::new(),
    };

    Ok(warnings)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::test_spec;
    use vm_spec_types::MilliCpu;

    fn reviewer() -> Reviewer {
        Reviewer::new(Logger::root(slog::Discard, o!()))
    }

    fn request(
        operation: Operation,
        object: Option<VirtualMachine>,
        old_object: Option<VirtualMachine>,
    ) -> AdmissionRequest {
        AdmissionRequest {
            uid: "705ab4f5-6393-11e8-b7cc-42010a800002".to_string(),
            operation,
            object,
            old_object,
        }
    }

    #[test]
    fn create_is_admitted() {
        let resp = reviewer().review(&request(
            Operation::Create,
            Some(test_spec().into()),
            None,
        ));
        assert!(resp.allowed);
        assert_eq!(resp.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert!(resp.status.is_none());
    }

    #[test]
    fn rejected_update_is_forbidden() {
        let old = test_spec();
        let mut new = old.clone();
        new.guest.cpus.max = MilliCpu::from_cpus(8);

        let resp = reviewer().review(&request(
            Operation::Update,
            Some(new.into()),
            Some(old.into()),
        ));
        assert!(!resp.allowed);
        assert_eq!(
            resp.status,
            Some(Status {
                code: 403,
                message: ".spec.guest.cpus.max is immutable".to_string(),
            })
        );
    }

    #[test]
    fn missing_objects_are_bad_requests() {
        let resp =
            reviewer().review(&request(Operation::Create, None, None));
        assert_eq!(resp.status.as_ref().map(|s| s.code), Some(400));

        let resp = reviewer().review(&request(
            Operation::Update,
            Some(test_spec().into()),
            None,
        ));
        let status = resp.status.unwrap();
        assert_eq!(status.code, 400);
        assert_eq!(status.message, "UPDATE request is missing oldObject");
    }

    #[test]
    fn delete_and_connect_are_always_admitted() {
        for op in [Operation::Delete, Operation::Connect] {
            assert!(reviewer().review(&request(op, None, None)).allowed);
        }

        let mut broken = test_spec();
        broken.guest.cpus.use_ = MilliCpu::from_cpus(100);
        let resp = reviewer().review(&request(
            Operation::Delete,
            None,
            Some(broken.into()),
        ));
        assert!(resp.allowed);
    }

    #[test]
    fn request_wire_format() {
        let spec = serde_json::to_value(VirtualMachine::from(test_spec()))
            .unwrap();
        let req: AdmissionRequest = serde_json::from_value(serde_json::json!({
            "uid": "abc",
            "operation": "CREATE",
            "object": spec,
        }))
        .unwrap();
        assert_eq!(req.operation, Operation::Create);
        assert!(req.old_object.is_none());

        let resp = reviewer().review(&req);
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            serde_json::json!({ "uid": "abc", "allowed": true })
        );
    }
}
