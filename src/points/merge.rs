use anyhow::Result;

use crate::regions::RegionIndex;

use super::PointStore;

/// A point source restricted to the regions whose key is one of `ids`.
#[derive(Debug, Clone)]
pub struct MergeSource<'a> {
    pub ids: Vec<String>,
    pub points: &'a PointStore,
}

/// Combine several point sources into one store.
///
/// Each source contributes only its points inside its own regions. The `default` source, if
/// any, contributes every point that lies outside all listed regions, so it fills in around the
/// more detailed sources.
pub fn merge_by_membership(
    regions: &RegionIndex,
    key: &str,
    sources: &[MergeSource<'_>],
    default: Option<&PointStore>,
) -> Result<PointStore> {
    let mut result = PointStore::new();

    for source in sources {
        let inside = regions.membership(&source.ids, key);
        let added = result.extend_filtered(source.points, |p| inside.contains(p.x, p.y))?;
        log::info!("[points::merge] {} of {} points from {:?}", added, source.points.len(), source.ids);
    }

    if let Some(points) = default {
        let all_ids = sources.iter().flat_map(|s| s.ids.iter().cloned()).collect::<Vec<_>>();
        let inside = regions.membership(&all_ids, key);
        let added = result.extend_filtered(points, |p| !inside.contains(p.x, p.y))?;
        log::info!("[points::merge] {} of {} points from the default source", added, points.len());
    }

    Ok(result)
}
