use engine_logging::{engine_debug, engine_info};
use harvester_core::{decode_page, RecordSet, TableName};

use crate::fetch::{log_body, Fetcher, ProgressSink, SourceRequest};
use crate::{EngineEvent, FailureKind, HarvestError, Stage, TargetProgress};

#[derive(Debug, Clone, PartialEq)]
pub struct PagedRecords {
    pub records: RecordSet,
    pub pages: usize,
}

/// Follows `Prev` cursors until the server returns an empty one.
///
/// Any failed page fails the whole retrieval; no partial record set is
/// returned.
pub struct PagedHarvester<'a> {
    fetcher: &'a dyn Fetcher,
    max_pages: usize,
}

impl<'a> PagedHarvester<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, max_pages: usize) -> Self {
        Self { fetcher, max_pages }
    }

    /// `cursor_root_url` is the absolute base each relative cursor is
    /// appended to.
    pub async fn fetch_all(
        &self,
        table: TableName,
        first_url: &str,
        cursor_root_url: &str,
        bearer_token: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PagedRecords, HarvestError> {
        let mut url = first_url.to_string();
        let mut records = RecordSet::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                return Err(HarvestError::new(
                    Stage::Fetching,
                    FailureKind::PageLimitExceeded {
                        max_pages: self.max_pages,
                    },
                    format!("{table}: stopped after {pages} pages with {} records", records.len()),
                ));
            }

            let body = self
                .fetcher
                .fetch(&SourceRequest::get(&url, bearer_token))
                .await?;
            pages += 1;
            log_body(table, &body);

            let page =
                decode_page(table, &body).map_err(|err| HarvestError::decode(Stage::Fetching, err))?;
            let next = page.next_cursor().map(str::to_owned);
            records.extend(page.items);

            progress.emit(EngineEvent::Progress(TargetProgress {
                table,
                stage: Stage::Fetching,
                records: Some(records.len()),
            }));

            match next {
                Some(cursor) => {
                    engine_debug!("{table}: page {pages} done, {} records so far", records.len());
                    url = format!("{cursor_root_url}{cursor}");
                }
                None => {
                    engine_info!("{table}: retrieved {} records in {pages} pages", records.len());
                    return Ok(PagedRecords { records, pages });
                }
            }
        }
    }
}
