//! Per-credential backup engine.
//!
//! [`backup_credential`] drives one credential through
//! `ResolvingIdentity → DiscoveringOrgs → MirroringOrgRepos →
//! MirroringUserRepos → Done`. Only identity resolution (and creating the
//! identity directory) can fail the run; everything after that is caught at
//! the narrowest loop, reported as a progress event and skipped.
//!
//! # Example
//!
//! ```ignore
//! use ghbackup::backup::{BackupOptions, backup_credential};
//! use ghbackup::github::{ClientOptions, GitHubClient};
//! use ghbackup::mirror::GitMirror;
//!
//! let client = GitHubClient::new(credential, ClientOptions::default())?;
//! let mirror = GitMirror::from_path()?;
//! let report = backup_credential(&client, &mirror, &BackupOptions::new(root), None).await?;
//! ```

use std::path::{Path, PathBuf};

use futures::StreamExt;
use serde::de::DeserializeOwned;

use super::progress::{BackupProgress, ProgressCallback, emit};
use super::types::{
    BackupError, BackupOptions, BackupReport, BackupState, ProcessedSet, RepositoryRef,
};
use crate::fs::ensure_dir;
use crate::github::{Account, GitHubClient, Paginator, RepoRecord, decode_page};
use crate::mirror::{MirrorRequest, RepoMirror};
use crate::names;
use crate::snapshot::{SnapshotOutcome, download_snapshot};

/// Back up every repository reachable by the client's credential.
///
/// Returns `Err` only when the credential is unusable. Downstream failures
/// are counted in the report.
pub async fn backup_credential(
    client: &GitHubClient,
    mirror: &dyn RepoMirror,
    options: &BackupOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<BackupReport, BackupError> {
    let backup = Backup {
        client,
        mirror,
        options,
        on_progress,
    };

    backup.enter(BackupState::ResolvingIdentity);
    let identity = backup.resolve_identity().await?;

    let mut run = Run {
        identity,
        processed: ProcessedSet::new(),
        report: BackupReport::default(),
    };
    run.report.identity = run.identity.clone();

    backup.enter(BackupState::DiscoveringOrgs);
    let orgs = backup.discover_orgs(&mut run).await;

    backup.enter(BackupState::MirroringOrgRepos);
    for org in &orgs {
        backup.mirror_org(&mut run, org).await;
    }

    backup.enter(BackupState::MirroringUserRepos);
    backup.mirror_user_repos(&mut run).await;

    backup.enter(BackupState::Done);
    tracing::debug!(
        identity = %run.identity,
        processed = run.processed.len(),
        "Backup finished"
    );
    emit(
        on_progress,
        BackupProgress::Finished {
            report: run.report.clone(),
        },
    );

    Ok(run.report)
}

/// Borrowed inputs shared by every step and every concurrent job.
struct Backup<'a> {
    client: &'a GitHubClient,
    mirror: &'a dyn RepoMirror,
    options: &'a BackupOptions,
    on_progress: Option<&'a ProgressCallback>,
}

/// Mutable per-credential state. Dropped at the end of the credential.
struct Run {
    identity: String,
    processed: ProcessedSet,
    report: BackupReport,
}

/// One repository ready to mirror into `parent`.
struct MirrorJob {
    repo: RepositoryRef,
    parent: PathBuf,
}

struct JobOutcome {
    mirrored: bool,
    snapshot: Option<bool>,
}

impl Backup<'_> {
    fn emit(&self, event: BackupProgress) {
        emit(self.on_progress, event);
    }

    fn enter(&self, state: BackupState) {
        tracing::debug!(%state, "Entering state");
        self.emit(BackupProgress::StateChanged { state });
    }

    async fn resolve_identity(&self) -> Result<String, BackupError> {
        let account = self
            .client
            .current_user()
            .await
            .map_err(BackupError::Identity)?;
        let login = names::path_segment(&account.login)
            .map_err(BackupError::InvalidIdentity)?
            .to_string();

        self.emit(BackupProgress::IdentityResolved {
            login: login.clone(),
        });

        let dir = self.options.identity_dir(&login);
        let status = ensure_dir(&dir, &self.options.dir_options).map_err(BackupError::Directory)?;
        if status.created {
            self.emit(BackupProgress::CreatedDirectory { path: dir });
        }

        Ok(login)
    }

    /// List the identity's organizations. A failed listing yields none.
    async fn discover_orgs(&self, run: &mut Run) -> Vec<String> {
        const NAMESPACE: &str = "organizations";

        let mut orgs = Vec::new();
        let mut pages = self.client.user_orgs();
        while let Some(records) = self.next_records::<Account>(run, NAMESPACE, &mut pages).await {
            match records {
                Some(accounts) => orgs.extend(accounts.into_iter().map(|a| a.login)),
                None => {
                    orgs.clear();
                    break;
                }
            }
        }

        run.report.orgs = orgs.len();
        self.emit(BackupProgress::OrgsDiscovered { count: orgs.len() });
        orgs
    }

    async fn mirror_org(&self, run: &mut Run, org: &str) {
        let org = match names::path_segment(org) {
            Ok(org) => org,
            Err(e) => {
                run.report.listing_failures += 1;
                self.emit(BackupProgress::ListingFailed {
                    namespace: org.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let dir = self.options.owner_dir(&run.identity, org);
        if !self.ensure_dir_reported(&dir) {
            run.report.listing_failures += 1;
            return;
        }

        self.emit(BackupProgress::FetchingRepos {
            namespace: org.to_string(),
        });

        let mut pages = self.client.org_repos(org);
        while let Some(Some(records)) = self.next_records::<RepoRecord>(run, org, &mut pages).await {
            let mut jobs = Vec::new();
            for record in records {
                if let Err(e) = names::path_segment(&record.name) {
                    self.skip_invalid(run, org, &record.name, &e.to_string());
                    continue;
                }
                if !self.mark(run, org, &record.name) {
                    continue;
                }
                jobs.push(MirrorJob {
                    repo: RepositoryRef {
                        owner: org.to_string(),
                        name: record.name,
                        clone_url: record.clone_url,
                    },
                    parent: dir.clone(),
                });
            }
            self.run_jobs(run, jobs).await;
        }
    }

    async fn mirror_user_repos(&self, run: &mut Run) {
        let namespace = run.identity.clone();
        self.emit(BackupProgress::FetchingRepos {
            namespace: namespace.clone(),
        });

        let mut pages = self.client.user_repos();
        while let Some(Some(records)) = self
            .next_records::<RepoRecord>(run, &namespace, &mut pages)
            .await
        {
            let mut jobs = Vec::new();
            for record in records {
                let repo = RepositoryRef::from(record);
                if let Err(e) =
                    names::path_segment(&repo.owner).and_then(|_| names::path_segment(&repo.name))
                {
                    self.skip_invalid(run, &repo.owner, &repo.name, &e.to_string());
                    continue;
                }
                if !self.mark(run, &repo.owner, &repo.name) {
                    continue;
                }

                let parent = self.options.owner_dir(&run.identity, &repo.owner);
                if !self.ensure_dir_reported(&parent) {
                    run.report.skipped += 1;
                    continue;
                }
                jobs.push(MirrorJob { repo, parent });
            }
            self.run_jobs(run, jobs).await;
        }
    }

    /// Fetch and decode the next page of a listing.
    ///
    /// Outer `None`: the listing is exhausted. Inner `None`: the listing
    /// failed and has been reported. Malformed records are reported and
    /// dropped.
    async fn next_records<T: DeserializeOwned>(
        &self,
        run: &mut Run,
        namespace: &str,
        pages: &mut Paginator<'_>,
    ) -> Option<Option<Vec<T>>> {
        let page = match pages.next_page().await? {
            Ok(page) => page,
            Err(e) => {
                self.listing_failed(run, namespace, e.to_string());
                return Some(None);
            }
        };

        let records = match decode_page::<T>(namespace, page) {
            Ok(records) => records,
            Err(e) => {
                self.listing_failed(run, namespace, e.to_string());
                return Some(None);
            }
        };

        self.emit(BackupProgress::FetchedPage {
            namespace: namespace.to_string(),
            page: pages.pages_fetched(),
            count: records.len(),
        });

        let mut decoded = Vec::with_capacity(records.len());
        for record in records {
            match record {
                Ok(record) => decoded.push(record),
                Err(e) => {
                    run.report.skipped += 1;
                    self.emit(BackupProgress::MalformedRecord {
                        namespace: namespace.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Some(Some(decoded))
    }

    fn listing_failed(&self, run: &mut Run, namespace: &str, error: String) {
        run.report.listing_failures += 1;
        self.emit(BackupProgress::ListingFailed {
            namespace: namespace.to_string(),
            error,
        });
    }

    fn skip_invalid(&self, run: &mut Run, owner: &str, name: &str, error: &str) {
        run.report.skipped += 1;
        self.emit(BackupProgress::InvalidName {
            owner: owner.to_string(),
            name: name.to_string(),
            error: error.to_string(),
        });
    }

    /// Claim `(owner, name)` for this run. False if it was claimed before.
    fn mark(&self, run: &mut Run, owner: &str, name: &str) -> bool {
        if run.processed.insert(owner, name) {
            return true;
        }
        run.report.duplicates += 1;
        self.emit(BackupProgress::Duplicate {
            owner: owner.to_string(),
            name: name.to_string(),
        });
        false
    }

    fn ensure_dir_reported(&self, dir: &Path) -> bool {
        match ensure_dir(dir, &self.options.dir_options) {
            Ok(status) => {
                if status.created {
                    self.emit(BackupProgress::CreatedDirectory {
                        path: dir.to_path_buf(),
                    });
                }
                true
            }
            Err(e) => {
                self.emit(BackupProgress::DirectoryFailed {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Run one page worth of jobs on the bounded pool and tally the results.
    async fn run_jobs(&self, run: &mut Run, jobs: Vec<MirrorJob>) {
        if jobs.is_empty() {
            return;
        }

        let identity = run.identity.as_str();
        let outcomes: Vec<JobOutcome> = futures::stream::iter(jobs)
            .map(|job| self.process(identity, job))
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            if outcome.mirrored {
                run.report.mirrored += 1;
            } else {
                run.report.failed += 1;
            }
            match outcome.snapshot {
                Some(true) => run.report.snapshots += 1,
                Some(false) => run.report.snapshot_failures += 1,
                None => {}
            }
        }
    }

    async fn process(&self, identity: &str, job: MirrorJob) -> JobOutcome {
        let MirrorJob { repo, parent } = job;

        self.emit(BackupProgress::Mirroring {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
        });

        let request = MirrorRequest {
            repo_name: &repo.name,
            clone_url: &repo.clone_url,
            dest_parent: &parent,
            identity_login: identity,
            credential: self.client.credential(),
        };

        let mirrored = match self.mirror.mirror(&request).await {
            Ok(outcome) => {
                self.emit(BackupProgress::Mirrored {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    path: outcome.path,
                    created: outcome.created,
                });
                true
            }
            Err(e) => {
                self.emit(BackupProgress::MirrorFailed {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    error: e.to_string(),
                });
                false
            }
        };

        let snapshot = if self.options.snapshots {
            self.snapshot(&repo, &parent).await
        } else {
            None
        };

        JobOutcome { mirrored, snapshot }
    }

    /// Best-effort archive download: `Some(true)` saved, `Some(false)`
    /// failed, `None` not available.
    async fn snapshot(&self, repo: &RepositoryRef, parent: &Path) -> Option<bool> {
        match download_snapshot(self.client, &repo.owner, &repo.name, parent).await {
            Ok(SnapshotOutcome::Saved { path, bytes }) => {
                self.emit(BackupProgress::SnapshotSaved {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    path,
                    bytes,
                });
                Some(true)
            }
            Ok(SnapshotOutcome::Skipped { status }) => {
                self.emit(BackupProgress::SnapshotSkipped {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    status,
                });
                None
            }
            Err(e) => {
                self.emit(BackupProgress::SnapshotFailed {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    error: e.to_string(),
                });
                Some(false)
            }
        }
    }
}
