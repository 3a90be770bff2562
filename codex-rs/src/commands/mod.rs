pub mod crop;
pub mod features;
pub mod segment;
pub mod summary;

use codex_rs::{selection, Catalog, NamingScheme};
use std::path::Path;

/// Build the catalog under `input` and keep the regions picked by `regions`.
pub(crate) fn selected_catalog(
    input: &str,
    scheme: NamingScheme,
    regions: &str,
) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = Catalog::build(Path::new(input), scheme)?;
    if catalog.is_empty() {
        return Err(format!("No region directories found in {}", input).into());
    }
    let names = selection::select_regions(regions, &catalog.region_names())?;
    if names.is_empty() {
        return Err(format!("Region selection {:?} matched nothing", regions).into());
    }
    Ok(catalog.subset(&names)?)
}
