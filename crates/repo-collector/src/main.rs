//! REPO 거래 수집기 CLI.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use repo_collector::modules::{self, CollectSettings};
use repo_collector::CollectorConfig;
use repo_core::{init_logging, parse_base_date, LogConfig, LogFormat};
use repo_data::{FscRepoClient, RepoStore};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repo-collector")]
#[command(about = "금융위원회 REPO 거래정보 수집기", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error) 또는 EnvFilter 지시문
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// 데이터베이스 (REPO_DATABASE_URL보다 우선)
    #[arg(long, global = true)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 기간 내 REPO 거래 수집 (주말/완료일 건너뜀)
    Collect {
        /// 시작일 (YYYYMMDD 또는 YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        /// 종료일 (YYYYMMDD 또는 YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
        /// 시작 전 API 연결 확인 생략
        #[arg(long)]
        skip_check: bool,
    },

    /// API 연결 확인
    Check {
        /// 점검 기준일 (기본: COLLECT_PROBE_DATE)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// 저장된 데이터 통계
    Stats,

    /// 최근 수집 상태 조회
    Status {
        /// 출력할 날짜 수
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// 원장 대신 기간 내 미수집 평일 출력
        #[arg(long)]
        pending: bool,
        /// 미수집 조회 시작일 (기본: COLLECT_START_DATE)
        #[arg(long, value_parser = parse_date_arg, requires = "pending")]
        from: Option<NaiveDate>,
        /// 미수집 조회 종료일 (기본: COLLECT_END_DATE 또는 오늘)
        #[arg(long, value_parser = parse_date_arg, requires = "pending")]
        to: Option<NaiveDate>,
    },

    /// 특정 날짜 수집 상태 초기화 (다음 실행에서 재수집)
    Reset {
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
    },

    /// 일별 가중평균 금리 테이블 생성
    Rates {
        /// 출력 SQLite 파일
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
    },

    /// 일별 금리 파일 병합 (같은 날짜는 앞선 입력 우선)
    Merge {
        /// 출력 SQLite 파일
        #[arg(long)]
        output: PathBuf,
        /// 입력 SQLite 파일들
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// 거래 데이터 CSV 내보내기
    Export {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
    },

    /// SQL 조회 결과를 CSV로 출력
    Query {
        /// 실행할 조회 문장
        sql: String,
        /// 출력 파일 (기본: 표준 출력)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// `YYYYMMDD` 또는 `YYYY-MM-DD` 날짜 인자
fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| parse_base_date(s).map_err(|e| e.to_string()))
        .map_err(|_| format!("날짜 형식이 아닙니다 (YYYYMMDD): {}", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::new(&cli.log_level).with_format(cli.log_format))?;

    // 설정 로드
    let mut config = CollectorConfig::from_env()?;
    if let Some(database) = cli.database {
        config.database_url = database;
    }
    tracing::debug!(config = ?config, "설정 로드 완료");

    match cli.command {
        Commands::Collect {
            from,
            to,
            skip_check,
        } => {
            let client = FscRepoClient::new(config.api.settings()?)?;
            if !skip_check {
                modules::check_api(&client, config.api.probe_date()?)
                    .await
                    .context("API 연결 확인 실패 (--skip-check로 생략 가능)")?;
            }

            let (start, end) = config.collect.date_range(from, to)?;
            if start > end {
                tracing::warn!(start = %start, end = %end, "시작일이 종료일보다 늦습니다");
            }

            let store = open_store(&config).await?;
            let settings = CollectSettings::from(&config.collect);

            tokio::select! {
                result = modules::collect_range(&store, &client, &settings, start, end) => {
                    let stats = result?;
                    stats.log_summary("REPO 거래 수집");
                    if stats.has_failures() {
                        tracing::warn!(
                            errors = stats.errors,
                            partial = stats.partial,
                            "실패한 날짜가 있습니다. 다시 실행하면 이어서 수집합니다"
                        );
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("종료 신호 수신, 완료되지 않은 날짜는 다음 실행에서 재수집됩니다");
                }
            }

            store.close().await;
        }
        Commands::Check { date } => {
            let client = FscRepoClient::new(config.api.settings()?)?;
            let probe = match date {
                Some(date) => date,
                None => config.api.probe_date()?,
            };
            let total = modules::check_api(&client, probe).await?;
            println!("{} 기준 전체 건수: {}", probe, total);
        }
        Commands::Stats => {
            let store = open_store(&config).await?;
            let stats = store.stats().await?;
            print!("{}", modules::render_store_stats(&stats));
            store.close().await;
        }
        Commands::Status {
            limit,
            pending,
            from,
            to,
        } => {
            let store = open_store(&config).await?;
            if pending {
                let (start, end) = config.collect.date_range(from, to)?;
                let dates = modules::pending_dates(&store, start, end).await?;
                print!("{}", modules::render_pending_dates(&dates));
            } else {
                let records = modules::list_status(&store, limit).await?;
                print!("{}", modules::render_status_table(&records));
            }
            store.close().await;
        }
        Commands::Reset { date } => {
            let store = open_store(&config).await?;
            modules::reset_date(&store, date).await?;
            store.close().await;
        }
        Commands::Rates { output, from, to } => {
            let store = open_store(&config).await?;
            match modules::resolve_range(&store, from, to).await? {
                Some((start, end)) => {
                    let filter = modules::rate_filter(&config.rates, start, end);
                    modules::build_daily_rates(&store, &filter, &output).await?;
                }
                None => tracing::warn!("저장된 거래가 없어 금리를 계산할 수 없습니다"),
            }
            store.close().await;
        }
        Commands::Merge { output, inputs } => {
            let summary = modules::merge_daily_rates(&inputs, &output).await?;
            tracing::info!(
                loaded = summary.loaded.len(),
                skipped = summary.skipped.len(),
                rows = summary.rows,
                "일별 금리 병합 완료"
            );
        }
        Commands::Export { output, from, to } => {
            let store = open_store(&config).await?;
            modules::export_trades(&store, &output, from, to).await?;
            store.close().await;
        }
        Commands::Query { sql, output } => {
            let store = open_store(&config).await?;
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("출력 파일 생성 실패: {}", path.display()))?;
                    modules::run_query(&store, &sql, std::io::BufWriter::new(file)).await?;
                }
                None => {
                    let stdout = std::io::stdout();
                    modules::run_query(&store, &sql, stdout.lock()).await?;
                    stdout.lock().flush()?;
                }
            }
            store.close().await;
        }
    }

    Ok(())
}

async fn open_store(config: &CollectorConfig) -> anyhow::Result<RepoStore> {
    RepoStore::connect(&config.database_url)
        .await
        .with_context(|| format!("데이터베이스 연결 실패: {}", config.database_url))
}
