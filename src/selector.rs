use crate::error::{Result, SpeedtestError};
use crate::types::{Server, ServerCatalog};
use log::warn;

/// Outcome of [`select`].
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub targets: Vec<Server>,
    /// Ids were requested but none matched, so `targets` is the nearest server.
    pub fell_back: bool,
}

impl Selection {
    /// Report line telling the user their ids were replaced, if they were.
    pub fn fallback_notice(&self) -> Option<String> {
        let nearest = self.targets.first().filter(|_| self.fell_back)?;
        Some(format!(
            "Requested servers not found, testing the nearest server [{}] {} instead",
            nearest.id, nearest.name
        ))
    }
}

/// Resolves requested server ids to the benchmark targets.
///
/// - no ids: the nearest server only
/// - ids: every matching server in catalog (distance) order, duplicates collapsed
/// - no match: the nearest server, flagged as a fallback
pub fn select(catalog: &ServerCatalog, requested: &[u32]) -> Result<Selection> {
    let nearest = catalog.nearest().ok_or(SpeedtestError::DirectoryEmpty)?;

    if requested.is_empty() {
        return Ok(Selection {
            targets: vec![nearest.clone()],
            fell_back: false,
        });
    }

    // 遍历目录而不是请求列表: 保持距离顺序, 重复的 id 自然只出现一次
    let targets: Vec<Server> = catalog
        .iter()
        .filter(|s| s.numeric_id().is_some_and(|id| requested.contains(&id)))
        .cloned()
        .collect();

    if targets.is_empty() {
        warn!(
            "None of the requested servers {:?} are in the catalog, testing the nearest server [{}] {} instead",
            requested, nearest.id, nearest.name
        );
        return Ok(Selection {
            targets: vec![nearest.clone()],
            fell_back: true,
        });
    }

    Ok(Selection {
        targets,
        fell_back: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn catalog() -> ServerCatalog {
        let servers = [("100", 1.0), ("200", 2.0), ("300", 3.0), ("400", 4.0)]
            .iter()
            .map(|(id, lat)| Server {
                id: id.to_string(),
                name: format!("Server {}", id),
                coordinate: Coordinate::new(*lat, 0.0),
                ..Default::default()
            })
            .collect();
        ServerCatalog::from_servers(Coordinate::new(0.0, 0.0), servers)
    }

    fn ids(servers: &[Server]) -> Vec<&str> {
        servers.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_empty_request_selects_nearest() -> Result<()> {
        let catalog = catalog();
        let selection = select(&catalog, &[])?;
        assert_eq!(selection.targets, vec![catalog.servers()[0].clone()]);
        assert!(!selection.fell_back);
        assert_eq!(selection.fallback_notice(), None);
        Ok(())
    }

    #[test]
    fn test_single_id_selects_that_server() -> Result<()> {
        let catalog = catalog();
        let selection = select(&catalog, &[300])?;
        assert_eq!(selection.targets, vec![catalog.servers()[2].clone()]);
        assert!(!selection.fell_back);
        Ok(())
    }

    #[test]
    fn test_unknown_id_falls_back_to_nearest() -> Result<()> {
        let catalog = catalog();
        let selection = select(&catalog, &[999])?;
        assert_eq!(ids(&selection.targets), vec!["100"]);
        assert!(selection.fell_back);
        assert_eq!(
            selection.fallback_notice().as_deref(),
            Some("Requested servers not found, testing the nearest server [100] Server 100 instead")
        );
        Ok(())
    }

    #[test]
    fn test_duplicates_collapse() -> Result<()> {
        let catalog = catalog();
        let selection = select(&catalog, &[100, 100])?;
        assert_eq!(ids(&selection.targets), vec!["100"]);
        Ok(())
    }

    #[test]
    fn test_selection_keeps_catalog_order() -> Result<()> {
        let catalog = catalog();
        // 部分命中不算回退
        let selection = select(&catalog, &[400, 999, 200])?;
        assert_eq!(ids(&selection.targets), vec!["200", "400"]);
        assert!(!selection.fell_back);
        assert_eq!(selection.fallback_notice(), None);
        Ok(())
    }

    #[test]
    fn test_empty_catalog_is_error() {
        let empty = ServerCatalog::default();
        assert!(matches!(select(&empty, &[]), Err(SpeedtestError::DirectoryEmpty)));
        assert!(matches!(select(&empty, &[1]), Err(SpeedtestError::DirectoryEmpty)));
    }
}
