// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in job handlers (spec §4.G): archive extraction and bulk
//! copy/move. `bootstrap_handlers` is the one place new job types get
//! wired into the registry.

pub mod bulk_copy;
pub mod extract_archive;

use std::sync::Arc;

use super::{HandlerRegistry, JobHandler};

pub fn bootstrap_handlers() -> HandlerRegistry {
    let mut registry: HandlerRegistry = HandlerRegistry::new();
    registry.insert(
        "extract_archive",
        Arc::new(extract_archive::ExtractArchiveHandler) as Arc<dyn JobHandler>,
    );
    registry.insert(
        "bulk_copy",
        Arc::new(bulk_copy::BulkCopyHandler::copy()) as Arc<dyn JobHandler>,
    );
    registry.insert(
        "bulk_move",
        Arc::new(bulk_copy::BulkCopyHandler::mv()) as Arc<dyn JobHandler>,
    );
    registry
}
