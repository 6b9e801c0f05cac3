use super::entry::visible_entry;
use super::{existing_actor, require, require_owner, Api};
use crate::domain::AccessLevel;
use crate::error::ApiError;
use crate::models::{AbuseReport, Principal};

impl Api {
    /// Records `nick` as a reporter of `entry`; repeat reports by the same
    /// actor are not counted twice.
    #[tracing::instrument(name = "Report abuse", skip(self, caller), fields(caller = %caller.nick()))]
    pub fn abuse_report_entry(
        &self,
        caller: &Principal,
        nick: &str,
        entry: &str,
    ) -> Result<AbuseReport, ApiError> {
        require(caller, AccessLevel::Write)?;
        let nick = self.clean_user_nick(nick)?;
        let mut db = self.store.write();
        require_owner(&db, caller, nick.as_str())?;
        existing_actor(&db, &nick)?;
        let reported = visible_entry(&db, caller, entry)?.clone();

        let report = db
            .abuse
            .entry(reported.key.clone())
            .or_insert_with(|| AbuseReport {
                entry: reported.key.clone(),
                actor: reported.owner.clone(),
                reports: Vec::new(),
                count: 0,
            });
        if !report.reports.iter().any(|r| r == nick.as_str()) {
            report.reports.push(nick.to_string());
            report.count = report.reports.len() as i64;
        }
        Ok(report.clone())
    }

    pub fn abuse_get_entry(
        &self,
        caller: &Principal,
        entry: &str,
    ) -> Result<AbuseReport, ApiError> {
        require(caller, AccessLevel::Admin)?;
        self.store
            .read()
            .abuse
            .get(entry)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("abuse report for {}", entry)))
    }

    pub fn entry_mark_as_spam(
        &self,
        caller: &Principal,
        entry: &str,
    ) -> Result<AbuseReport, ApiError> {
        self.abuse_report_entry(caller, caller.nick(), entry)
    }
}
