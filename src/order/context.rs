use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context as _;

use crate::{
    foundation::error::{PrintError, PrintResult},
    order::{
        info::{DeclaredAssetSet, DesignSide, OrderInfo, OrderRecord, is_remote_reference},
        naming::{NameSources, derive_base_name, unique_output_path},
        scratch::ScratchDir,
        search::{MAX_SEARCH_DEPTH, file_name_eq, files_in, find_file, has_extension},
    },
    template::catalog::{Template, TemplateCatalog},
};

/// One order to prepare: where its record lives and how to name it.
#[derive(Clone, Debug)]
pub struct OrderJob {
    /// JSON customization record.
    pub record_path: PathBuf,
    /// Folder holding everything belonging to the order.
    pub order_root: PathBuf,
    /// Customer name to use when nothing better is found on disk.
    pub customer_hint: String,
    /// Total quantity of the batch this order belongs to, if known.
    pub total_quantity: Option<u32>,
}

impl OrderJob {
    /// Job whose order root is the record's own directory.
    pub fn for_record(record_path: impl Into<PathBuf>) -> Self {
        let record_path = record_path.into();
        let order_root = record_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            record_path,
            order_root,
            customer_hint: String::new(),
            total_quantity: None,
        }
    }
}

/// Everything one render needs, resolved up front.
///
/// Consumed by exactly one render; dropping it deletes the scratch directory.
#[derive(Debug)]
pub struct RenderContext {
    /// Geometry for the order's capacity.
    pub template: Template,
    /// Order metadata.
    pub info: OrderInfo,
    /// Which sides receive artwork.
    pub design_side: DesignSide,
    /// Located vector design.
    pub design_path: PathBuf,
    /// Images the record requires.
    pub declared_assets: DeclaredAssetSet,
    /// Unique destination file.
    pub output_path: PathBuf,
    /// Scratch space owned by this render.
    pub scratch: ScratchDir,
}

/// Resolves order inputs into [`RenderContext`]s.
///
/// Output names handed out are remembered so orders prepared concurrently never share a file.
pub struct OrderContextBuilder {
    catalog: Arc<TemplateCatalog>,
    scratch_root: PathBuf,
    reserved: Mutex<HashSet<PathBuf>>,
}

impl OrderContextBuilder {
    /// Builder drawing templates from `catalog` and scratch space from `scratch_root`.
    pub fn new(catalog: Arc<TemplateCatalog>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            scratch_root: scratch_root.into(),
            reserved: Mutex::new(HashSet::new()),
        }
    }

    /// Shared template catalog.
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Resolve every input of `job` or fail with a descriptive error.
    ///
    /// Creates `output_dir` and a fresh scratch directory as side effects.
    pub fn prepare(
        &self,
        job: &OrderJob,
        output_dir: &Path,
        file_suffix: &str,
    ) -> PrintResult<RenderContext> {
        let json = std::fs::read_to_string(&job.record_path)
            .with_context(|| format!("read order record '{}'", job.record_path.display()))?;
        let OrderRecord {
            mut info,
            declared_assets,
        } = OrderRecord::parse(&json)?;
        if let Some(total) = job.total_quantity {
            info.total_quantity = total.max(info.quantity);
        }

        let record_dir = job
            .record_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let design_path = locate_design(&job.record_path, &record_dir, &job.order_root, &info)?;
        let design_dir = design_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        check_declared_assets(&declared_assets, &design_dir, &job.order_root)?;

        let template = *self
            .catalog
            .template_for(info.capacity.unwrap_or(self.catalog.default_capacity()));

        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("create output directory '{}'", output_dir.display()))?;
        let base = derive_base_name(&NameSources {
            order_id: &info.order_id,
            record_dir: &record_dir,
            order_root: &job.order_root,
            customer_hint: &job.customer_hint,
            output_dir,
        });
        let output_path = {
            let mut reserved = self
                .reserved
                .lock()
                .map_err(|_| PrintError::render("output name registry poisoned"))?;
            let path = unique_output_path(
                output_dir,
                info.quantity,
                &base,
                &info.order_id,
                file_suffix,
                &reserved,
            );
            reserved.insert(path.clone());
            path
        };

        let scratch = ScratchDir::create(&self.scratch_root, &info.order_id)?;
        tracing::debug!(
            order_id = %info.order_id,
            design = %design_path.display(),
            output = %output_path.display(),
            template = %template.capacity,
            "prepared order context"
        );

        Ok(RenderContext {
            template,
            design_side: info.design_side,
            info,
            design_path,
            declared_assets,
            output_path,
            scratch,
        })
    }
}

/// Find the vector design: beside the record first, then anywhere under the order root.
fn locate_design(
    record_path: &Path,
    record_dir: &Path,
    order_root: &Path,
    info: &OrderInfo,
) -> PrintResult<PathBuf> {
    let stem = record_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let same_stem = format!("{stem}.svg");
    let names_order = |p: &Path| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(info.order_item_id.as_str()))
    };

    let nearby: Vec<PathBuf> = files_in(record_dir)
        .into_iter()
        .filter(|p| has_extension(p, &["svg"]))
        .collect();
    if let Some(p) = nearby.iter().find(|p| file_name_eq(p, &same_stem)) {
        return Ok(p.clone());
    }
    if let Some(p) = nearby.iter().find(|p| names_order(p)) {
        return Ok(p.clone());
    }
    if let Some(p) = nearby.first() {
        return Ok(p.clone());
    }

    find_file(order_root, MAX_SEARCH_DEPTH, |p| {
        has_extension(p, &["svg"]) && (file_name_eq(p, &same_stem) || names_order(p))
    })
    .ok_or_else(|| {
        PrintError::missing_input(format!(
            "no vector design found for order {} near '{}' or under '{}'",
            info.order_id,
            record_path.display(),
            order_root.display()
        ))
    })
}

/// Every declared local image must exist beside the design or somewhere under the order root.
fn check_declared_assets(
    declared: &DeclaredAssetSet,
    design_dir: &Path,
    order_root: &Path,
) -> PrintResult<()> {
    for reference in declared.references() {
        if is_remote_reference(reference) {
            continue;
        }
        let Some(name) = Path::new(reference.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        if design_dir.join(reference).is_file() || design_dir.join(&name).is_file() {
            continue;
        }
        let found = find_file(order_root, MAX_SEARCH_DEPTH, |p| file_name_eq(p, &name));
        if found.is_none() {
            return Err(PrintError::missing_input(format!(
                "declared image '{reference}' not found beside '{}' or under '{}'",
                design_dir.display(),
                order_root.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/order/context.rs"]
mod tests;
