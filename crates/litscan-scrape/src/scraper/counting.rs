//! Counting mode: the pairwise co-occurrence sweep.

use chrono::Utc;
use tracing::{debug, info, instrument};

use litscan_common::{LitscanError, Result};

use super::{get_db_info, search_count, ScrapeMeta, Scraper};
use crate::counts::Counts;
use crate::query::SearchQuery;
use crate::requester::{Session, Transport};
use crate::terms::{Dimension, TermGroup};
use crate::urls::{UrlOption, Urls};

impl<T: Transport> Scraper<T> {
    fn counting_urls(&self) -> Result<Urls> {
        let mut urls = self.base_urls().with(UrlOption::Retmax, "0");
        urls.build_info(&[UrlOption::Db])?;
        urls.build_search(&self.with_field(&[UrlOption::Db, UrlOption::Retmax, UrlOption::Retmode]))?;
        Ok(urls)
    }

    /// Fill `counts` with single-term and joint counts, then save the run
    /// under `name`.
    ///
    /// In square mode (no B groups) only the upper triangle and diagonal are
    /// queried; each joint count is mirrored to the lower triangle, and each
    /// group's single-term count is requested once.
    #[instrument(skip_all, fields(name = %name, square = counts.is_square()))]
    pub async fn collect_counts(&mut self, counts: &mut Counts, name: &str) -> Result<()> {
        if counts.terms(Dimension::A).is_empty() {
            return Err(LitscanError::Configuration("No A term groups to count".into()));
        }

        let urls = self.counting_urls()?;
        counts.prepare();
        let square = counts.is_square();
        let n_a = counts.terms(Dimension::A).len();
        let n_b = counts.terms(Dimension::B).len();
        info!(n_a, n_b, "Starting co-occurrence sweep");

        let mut session = self.requester.open();
        let db_info = get_db_info(&mut session, &urls).await?;

        for a in 0..n_a {
            let group_a = counts.terms(Dimension::A).groups()[a].clone();
            let count_a = single_count(&mut session, &urls, counts, Dimension::A, a, &group_a).await?;

            let first_b = if square { a } else { 0 };
            for b in first_b..n_b {
                let group_b = counts.terms(Dimension::B).groups()[b].clone();
                let count_b = single_count(&mut session, &urls, counts, Dimension::B, b, &group_b).await?;

                let joint = search_count(&mut session, &urls, &SearchQuery::pair(&group_a, &group_b))
                    .await
                    .map_err(|e| e.for_term(&format!("{} AND {}", group_a.label(), group_b.label()), "joint search"))?;

                if let Some(matrix) = counts.matrix_mut() {
                    matrix.fill(a, b, joint, count_a);
                    if square && a != b {
                        matrix.fill(b, a, joint, count_b);
                    }
                }
                debug!(a = %group_a.label(), b = %group_b.label(), joint, "Joint count");
            }

            info!(label = %group_a.label(), count = count_a, row = a + 1, of = n_a, "Finished row");
            if self.counts_config.checkpoint_rows {
                self.store.save_counts(name, &counts.snapshot()).await?;
            }
        }

        let requests = session.finish();
        info!(n_requests = requests.n_requests, "Co-occurrence sweep complete");
        counts.set_meta(ScrapeMeta { date: Utc::now(), db_info, requests });
        self.store.save_counts(name, &counts.snapshot()).await?;
        Ok(())
    }
}

/// Single-term count for one group, queried only if not yet measured.
async fn single_count<T: Transport>(
    session: &mut Session<'_, T>,
    urls: &Urls,
    counts: &mut Counts,
    dim: Dimension,
    index: usize,
    group: &TermGroup,
) -> Result<u64> {
    if let Some(count) = counts.terms(dim).count(index) {
        return Ok(count);
    }
    let count = search_count(session, urls, &SearchQuery::single(group))
        .await
        .map_err(|e| e.for_term(group.label(), "single search"))?;
    counts.terms_mut(dim).set_count(index, count);
    debug!(label = %group.label(), count, "Single-term count");
    Ok(count)
}
