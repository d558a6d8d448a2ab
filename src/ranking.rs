//! Derived views over a snapshot: search filter and gainer/loser rankings
//!
//! All functions are pure and keep input order for ties (stable sort).
//! Assets whose 24h change is missing or not numeric rank after every
//! asset with a usable value, in both directions.

use crate::types::Asset;
use std::cmp::Ordering;

/// Case-insensitive substring match against the asset's label
///
/// The label is the name, or the symbol for unnamed assets. The query is
/// matched as typed, whitespace included; only the empty query matches
/// everything.
pub fn filter_by_query<'a>(assets: &'a [Asset], query: &str) -> Vec<&'a Asset> {
    if query.is_empty() {
        return assets.iter().collect();
    }
    let needle = query.to_lowercase();

    assets
        .iter()
        .filter(|asset| asset.label().to_lowercase().contains(&needle))
        .collect()
}

/// The `n` assets with the largest 24h change, largest first
pub fn top_gainers<'a, I>(assets: I, n: usize) -> Vec<&'a Asset>
where
    I: IntoIterator<Item = &'a Asset>,
{
    ranked(assets, n, |a, b| b.total_cmp(&a))
}

/// The `n` assets with the smallest 24h change, most negative first
pub fn top_losers<'a, I>(assets: I, n: usize) -> Vec<&'a Asset>
where
    I: IntoIterator<Item = &'a Asset>,
{
    ranked(assets, n, |a, b| a.total_cmp(&b))
}

fn ranked<'a, I, F>(assets: I, n: usize, cmp: F) -> Vec<&'a Asset>
where
    I: IntoIterator<Item = &'a Asset>,
    F: Fn(f64, f64) -> Ordering,
{
    let mut keyed: Vec<(Option<f64>, &'a Asset)> = assets
        .into_iter()
        .map(|asset| (asset.change_percent_24h(), asset))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => cmp(*a, *b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().take(n).map(|(_, asset)| asset).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_change(id: &str, change: &str) -> Asset {
        let mut asset = Asset::new(id, id.to_uppercase(), id);
        asset.change_percent_24_hr = change.to_string();
        asset
    }

    fn changes(assets: &[&Asset]) -> Vec<String> {
        assets
            .iter()
            .map(|a| a.change_percent_24_hr.clone())
            .collect()
    }

    #[test]
    fn test_top_gainers() {
        let assets = vec![
            with_change("a", "-3"),
            with_change("b", "10"),
            with_change("c", "1"),
        ];
        assert_eq!(changes(&top_gainers(&assets, 2)), vec!["10", "1"]);
    }

    #[test]
    fn test_top_losers() {
        let assets = vec![
            with_change("a", "-3"),
            with_change("b", "10"),
            with_change("c", "1"),
        ];
        assert_eq!(changes(&top_losers(&assets, 2)), vec!["-3", "1"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let assets = vec![
            with_change("first", "2.5"),
            with_change("second", "2.50"),
            with_change("third", "2.5"),
        ];
        let ids: Vec<_> = top_gainers(&assets, 3).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);

        let ids: Vec<_> = top_losers(&assets, 3).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unparsable_changes_rank_last() {
        let assets = vec![
            with_change("missing", ""),
            with_change("down", "-1"),
            with_change("up", "4"),
        ];
        let gainers: Vec<_> = top_gainers(&assets, 3).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(gainers, vec!["up", "down", "missing"]);

        let losers: Vec<_> = top_losers(&assets, 3).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(losers, vec!["down", "up", "missing"]);
    }

    #[test]
    fn test_n_larger_than_input() {
        let assets = vec![with_change("a", "1")];
        assert_eq!(top_gainers(&assets, 5).len(), 1);
        assert!(top_losers(&assets, 0).is_empty());
    }

    #[test]
    fn test_filter_by_query() {
        let assets = vec![
            Asset::new("bitcoin", "BTC", "Bitcoin"),
            Asset::new("ethereum", "ETH", "Ethereum"),
        ];

        let hits = filter_by_query(&assets, "bit");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Bitcoin");

        let all: Vec<_> = filter_by_query(&assets, "").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(all, vec!["bitcoin", "ethereum"]);

        assert_eq!(filter_by_query(&assets, "ETHER").len(), 1);
        assert!(filter_by_query(&assets, "doge").is_empty());
    }

    #[test]
    fn test_filter_keeps_whitespace_in_query() {
        let assets = vec![
            Asset::new("bitcoin", "BTC", "Bitcoin"),
            Asset::new("bitcoin-cash", "BCH", "Bitcoin Cash"),
        ];

        let hits: Vec<_> = filter_by_query(&assets, "coin ").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(hits, vec!["bitcoin-cash"]);

        let blank: Vec<_> = filter_by_query(&assets, "   ").iter().map(|a| a.id.as_str()).collect();
        assert!(blank.is_empty());
    }

    #[test]
    fn test_filter_uses_symbol_for_unnamed_assets() {
        let assets = vec![Asset::new("x", "XYZ", "")];
        assert_eq!(filter_by_query(&assets, "xy").len(), 1);
    }

    #[test]
    fn test_filter_then_rank() {
        let mut assets = vec![
            with_change("bitcoin", "2"),
            with_change("bitcoin-cash", "7"),
            with_change("ethereum", "9"),
        ];
        assets[0].name = "Bitcoin".to_string();
        assets[1].name = "Bitcoin Cash".to_string();
        assets[2].name = "Ethereum".to_string();

        let filtered = filter_by_query(&assets, "bitcoin");
        let top: Vec<_> = top_gainers(filtered, 1).iter().map(|a| a.id.as_str()).collect();
        assert_eq!(top, vec!["bitcoin-cash"]);
    }
}
