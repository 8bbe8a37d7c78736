use super::test_helpers::*;
use super::*;
use crate::error::AuditError;
use crate::logging::test_support::Level;
use crate::types::Lookup;
use serde_json::{Value, json};

mod persist;
