//! Filing Selector: decides which listed filings are worth reading.
//!
//! Pure and synchronous. The policy is data, so a caller can swap it
//! without touching retrieval or normalization.

use chrono::{Months, NaiveDate};
use filinglens_shared::{FilingLensError, FilingRecord, InterimPolicy, Result, SelectionConfig};
use tracing::debug;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Kind of periodic report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilingClass {
    Annual,
    SemiAnnual,
    Quarterly,
    Other,
}

impl FilingClass {
    pub fn is_interim(self) -> bool {
        matches!(self, Self::SemiAnnual | Self::Quarterly)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::SemiAnnual => "semi-annual",
            Self::Quarterly => "quarterly",
            Self::Other => "other",
        }
    }
}

/// Ordered `class -> trigger substrings` rows. The first row with a
/// trigger contained in a title decides that title's class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationTable {
    rows: Vec<(FilingClass, Vec<String>)>,
}

impl ClassificationTable {
    pub fn new(rows: Vec<(FilingClass, Vec<String>)>) -> Self {
        Self { rows }
    }

    pub fn classify(&self, title: &str) -> FilingClass {
        self.rows
            .iter()
            .find(|(_, triggers)| {
                triggers
                    .iter()
                    .any(|t| !t.is_empty() && title.contains(t.as_str()))
            })
            .map(|(class, _)| *class)
            .unwrap_or(FilingClass::Other)
    }
}

impl Default for ClassificationTable {
    fn default() -> Self {
        Self::from(&SelectionConfig::default())
    }
}

impl From<&SelectionConfig> for ClassificationTable {
    fn from(config: &SelectionConfig) -> Self {
        Self::new(vec![
            (FilingClass::Annual, config.annual.clone()),
            (FilingClass::SemiAnnual, config.semi_annual.clone()),
            (FilingClass::Quarterly, config.quarterly.clone()),
        ])
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which interim filings on or after the cutoff are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterimRetention {
    All,
    /// Only the `n` most recent.
    MostRecent(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub table: ClassificationTable,
    /// Interims received before `reference_date - cutoff_months` are dropped.
    pub cutoff_months: u32,
    pub retention: InterimRetention,
}

impl SelectionPolicy {
    /// Every annual filing plus every interim filing since the cutoff.
    pub fn all_interims() -> Self {
        Self {
            retention: InterimRetention::All,
            ..Self::default()
        }
    }

    /// Every annual filing plus the `n` most recent interims since the cutoff.
    pub fn recent_interims(n: usize) -> Self {
        Self {
            retention: InterimRetention::MostRecent(n),
            ..Self::default()
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        let retention = match config.policy {
            InterimPolicy::AllInterims => InterimRetention::All,
            InterimPolicy::RecentInterims => InterimRetention::MostRecent(config.interim_cap),
        };
        Self {
            table: ClassificationTable::from(config),
            cutoff_months: config.cutoff_months,
            retention,
        }
    }

    /// `reference_date - cutoff_months`, clamped to month end when needed.
    pub fn cutoff(&self, reference_date: NaiveDate) -> NaiveDate {
        reference_date
            .checked_sub_months(Months::new(self.cutoff_months))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Date bounds of one run, derived from the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cutoff: NaiveDate,
}

impl SelectionWindow {
    pub fn compute(today: NaiveDate, lookback_months: u32, cutoff_months: u32) -> Result<Self> {
        let back = |months: u32| {
            today.checked_sub_months(Months::new(months)).ok_or_else(|| {
                FilingLensError::validation(format!("{months} months before {today} is out of range"))
            })
        };

        Ok(Self {
            start: back(lookback_months)?,
            end: today,
            cutoff: back(cutoff_months)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Select the filings to read, oldest first.
///
/// Annual filings are always kept. Interims are kept only on or after the
/// cutoff, then capped per [`InterimRetention`] (most recent first, ties in
/// catalog order). Everything else is dropped. The result is sorted by
/// receipt date, then receipt id.
pub fn select(
    records: &[FilingRecord],
    policy: &SelectionPolicy,
    reference_date: NaiveDate,
) -> Vec<FilingRecord> {
    let cutoff = policy.cutoff(reference_date).format("%Y%m%d").to_string();

    let mut annual: Vec<&FilingRecord> = Vec::new();
    let mut interim: Vec<&FilingRecord> = Vec::new();

    for record in records {
        match policy.table.classify(&record.title) {
            FilingClass::Annual => annual.push(record),
            class if class.is_interim() => {
                if record.receipt_date.as_str() >= cutoff.as_str() {
                    interim.push(record);
                }
            }
            _ => debug!(receipt_id = %record.receipt_id, title = %record.title, "unclassified filing dropped"),
        }
    }

    if let InterimRetention::MostRecent(n) = policy.retention {
        // Stable sort keeps catalog order among equal dates.
        interim.sort_by(|a, b| b.receipt_date.cmp(&a.receipt_date));
        interim.truncate(n);
    }

    let mut selected: Vec<FilingRecord> = annual.into_iter().chain(interim).cloned().collect();
    selected.sort_by(|a, b| {
        a.receipt_date
            .cmp(&b.receipt_date)
            .then_with(|| a.receipt_id.cmp(&b.receipt_id))
    });

    debug!(listed = records.len(), selected = selected.len(), %cutoff, "filings selected");
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(receipt_id: &str, title: &str, receipt_date: &str) -> FilingRecord {
        FilingRecord {
            receipt_id: receipt_id.into(),
            title: title.into(),
            receipt_date: receipt_date.into(),
            issuer_id: "00126380".into(),
            trading_id: "005930".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    /// Three years of filings, newest first as the registry lists them.
    fn catalog() -> Vec<FilingRecord> {
        vec![
            record("20240515000001", "분기보고서 (2024.03)", "20240515"),
            record("20240312000002", "사업보고서 (2023.12)", "20240312"),
            record("20231114000003", "분기보고서 (2023.09)", "20231114"),
            record("20230814000004", "반기보고서 (2023.06)", "20230814"),
            record("20230515000005", "분기보고서 (2023.03)", "20230515"),
            record("20230307000006", "사업보고서 (2022.12)", "20230307"),
            record("20221114000007", "분기보고서 (2022.09)", "20221114"),
            record("20220309000008", "사업보고서 (2021.12)", "20220309"),
            record("20220120000009", "주요사항보고서(자기주식취득결정)", "20220120"),
        ]
    }

    fn ids(records: &[FilingRecord]) -> Vec<&str> {
        records.iter().map(|r| r.receipt_id.as_str()).collect()
    }

    #[test]
    fn default_table_classifies_registry_titles() {
        let table = ClassificationTable::default();
        assert_eq!(table.classify("사업보고서 (2023.12)"), FilingClass::Annual);
        assert_eq!(table.classify("[기재정정]사업보고서 (2023.12)"), FilingClass::Annual);
        assert_eq!(table.classify("반기보고서 (2023.06)"), FilingClass::SemiAnnual);
        assert_eq!(table.classify("분기보고서 (2023.09)"), FilingClass::Quarterly);
        assert_eq!(table.classify("감사보고서제출"), FilingClass::Other);
    }

    #[test]
    fn first_matching_row_wins() {
        let table = ClassificationTable::new(vec![
            (FilingClass::Quarterly, vec!["보고서".into()]),
            (FilingClass::Annual, vec!["사업보고서".into()]),
        ]);
        assert_eq!(table.classify("사업보고서"), FilingClass::Quarterly);
    }

    #[test]
    fn all_interims_keeps_every_annual_and_recent_interims() {
        let selected = select(&catalog(), &SelectionPolicy::all_interims(), today());

        assert_eq!(
            ids(&selected),
            [
                "20220309000008",
                "20230307000006",
                "20230814000004",
                "20231114000003",
                "20240312000002",
                "20240515000001",
            ]
        );
    }

    #[test]
    fn recent_interims_caps_to_most_recent() {
        let selected = select(&catalog(), &SelectionPolicy::recent_interims(2), today());

        assert_eq!(
            ids(&selected),
            [
                "20220309000008",
                "20230307000006",
                "20231114000003",
                "20240312000002",
                "20240515000001",
            ]
        );
    }

    #[test]
    fn annual_filings_ignore_the_cutoff() {
        let old_annual = vec![record("20210310000001", "사업보고서 (2020.12)", "20210310")];
        let selected = select(&old_annual, &SelectionPolicy::recent_interims(0), today());
        assert_eq!(ids(&selected), ["20210310000001"]);
    }

    #[test]
    fn interim_on_cutoff_day_is_kept() {
        let records = vec![
            record("2", "반기보고서", "20230630"),
            record("1", "분기보고서", "20230629"),
        ];
        let selected = select(&records, &SelectionPolicy::all_interims(), today());
        assert_eq!(ids(&selected), ["2"]);
    }

    #[test]
    fn cap_ties_break_by_catalog_order() {
        let records = vec![
            record("B", "분기보고서", "20240515"),
            record("A", "분기보고서", "20240515"),
            record("C", "분기보고서", "20240515"),
        ];
        let selected = select(&records, &SelectionPolicy::recent_interims(2), today());
        // B and A survive the cap; output is ordered by id among equal dates.
        assert_eq!(ids(&selected), ["A", "B"]);
    }

    #[test]
    fn other_filings_are_never_selected() {
        let records = vec![record("1", "주요사항보고서", "20240601")];
        assert!(select(&records, &SelectionPolicy::all_interims(), today()).is_empty());
    }

    #[test]
    fn selection_is_deterministic_and_order_independent() {
        let policy = SelectionPolicy::recent_interims(2);
        let forward = select(&catalog(), &policy, today());

        let mut reversed = catalog();
        reversed.reverse();
        assert_eq!(select(&catalog(), &policy, today()), forward);
        assert_eq!(ids(&select(&reversed, &policy, today())), ids(&forward));
    }

    #[test]
    fn output_is_sorted_ascending() {
        let selected = select(&catalog(), &SelectionPolicy::all_interims(), today());
        assert!(selected.windows(2).all(|w| w[0].receipt_date <= w[1].receipt_date));
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select(&[], &SelectionPolicy::default(), today()).is_empty());
    }

    #[test]
    fn policy_from_config() {
        let config = SelectionConfig {
            policy: InterimPolicy::RecentInterims,
            interim_cap: 3,
            cutoff_months: 6,
            ..SelectionConfig::default()
        };
        let policy = SelectionPolicy::from_config(&config);
        assert_eq!(policy.retention, InterimRetention::MostRecent(3));
        assert_eq!(policy.cutoff_months, 6);
        assert_eq!(SelectionPolicy::default().retention, InterimRetention::All);
    }

    #[test]
    fn window_from_reference_date() {
        let window = SelectionWindow::compute(today(), 36, 12).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2021, 6, 30).unwrap());
        assert_eq!(window.end, today());
        assert_eq!(window.cutoff, NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
    }

    #[test]
    fn window_clamps_leap_day() {
        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let window = SelectionWindow::compute(leap, 36, 12).unwrap();
        assert_eq!(window.cutoff, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }
}
