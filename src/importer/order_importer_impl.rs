// ==========================================
// 订单批量导入 - 导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到数据库
// 流程: 解析 → 映射 → 构建 → 校验 → 对账 → 写入 → 汇总 → 台账
// 红线: 只有文件/工作表获取与已存在订单查询会中止请求;其余错误按行累积
// ==========================================

use crate::config::{IngestConfigReader, IngestSettings};
use crate::domain::import::{ErrorDetail, ImportBatch, ImportOptions, ImportReport};
use crate::domain::order::OrderCandidate;
use crate::importer::batch_writer::BatchWriter;
use crate::importer::cell::SheetGrid;
use crate::importer::date_normalizer::DateNormalizer;
use crate::importer::error::{ImportError, IngestResult};
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::order_importer_trait::{
    FieldMapper, FileParser, OrderImporter, OrderReconciler, RecordValidator,
};
use crate::importer::reconciler::{lookup_ids, Reconciler};
use crate::importer::record_builder::{RecordBuilder, RowOutcome};
use crate::importer::record_validator::RecordValidator as RecordValidatorImpl;
use crate::importer::result_aggregator::ResultAggregator;
use crate::repository::OrderImportRepository;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RowAccumulator - 逐行折叠结果
// ==========================================
#[derive(Debug, Default)]
struct RowAccumulator {
    candidates: Vec<OrderCandidate>,
    validation_errors: Vec<ErrorDetail>,
    blank_rows: usize,
}

// ==========================================
// OrderImporterImpl - 订单导入器实现
// ==========================================
pub struct OrderImporterImpl<R, C>
where
    R: OrderImportRepository,
    C: IngestConfigReader,
{
    // 数据访问层
    import_repo: R,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    reconciler: Box<dyn OrderReconciler>,
}

impl<R, C> OrderImporterImpl<R, C>
where
    R: OrderImportRepository,
    C: IngestConfigReader,
{
    /// 创建新的 OrderImporter 实例
    ///
    /// # 参数
    /// - import_repo: 订单导入仓储
    /// - config: 配置读取器
    /// - file_parser: 文件解析器
    /// - field_mapper: 字段映射器
    /// - reconciler: 对账分类器
    pub fn new(
        import_repo: R,
        config: C,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        reconciler: Box<dyn OrderReconciler>,
    ) -> Self {
        Self {
            import_repo,
            config,
            file_parser,
            field_mapper,
            reconciler,
        }
    }

    /// 使用默认组件创建（按扩展名选择解析器）
    pub fn with_default_components(import_repo: R, config: C) -> Self {
        Self::new(
            import_repo,
            config,
            Box::new(UniversalFileParser),
            Box::new(FieldMapperImpl),
            Box::new(Reconciler),
        )
    }

    pub fn repository(&self) -> &R {
        &self.import_repo
    }

    /// 逐行映射、构建、校验,折叠为候选订单与校验错误
    fn collect_candidates(
        &self,
        grid: &SheetGrid,
        builder: &RecordBuilder,
        validator: &dyn RecordValidator,
    ) -> RowAccumulator {
        grid.rows
            .iter()
            .fold(RowAccumulator::default(), |mut acc, row| {
                if row.is_blank() {
                    acc.blank_rows += 1;
                    return acc;
                }

                let record = self.field_mapper.map_row(&grid.headers, row);
                match builder.build(&record) {
                    RowOutcome::Candidate(candidate) => match validator.validate(&candidate) {
                        Ok(()) => acc.candidates.push(candidate),
                        Err(detail) => acc.validation_errors.push(detail),
                    },
                    RowOutcome::Blank => acc.blank_rows += 1,
                    RowOutcome::Rejected(detail) => {
                        debug!(row = detail.row, reason = %detail.message, "行被拒绝");
                        acc.validation_errors.push(detail);
                    }
                }
                acc
            })
    }

    /// 导入主流程（网格已就绪）
    async fn run_pipeline(
        &self,
        grid: SheetGrid,
        file_name: Option<String>,
        options: &ImportOptions,
        batch_id: String,
        start_time: Instant,
    ) -> IngestResult<ImportReport> {
        if grid.headers.iter().all(|h| h.trim().is_empty()) || grid.has_no_data() {
            error!(batch_id = %batch_id, "工作表为空");
            return Err(ImportError::EmptySheet(
                grid.sheet_name.clone().unwrap_or_else(|| "未命名工作表".to_string()),
            ));
        }

        if options.auto_generate_order_ids {
            warn!(batch_id = %batch_id, "autoGenerateOrderIds 已忽略: 订单号必须由调用方提供");
        }

        let settings: IngestSettings = self.config.load_settings().await?;
        let normalizer = DateNormalizer::new(
            settings.slash_date_convention,
            settings.date_window_min_year,
            settings.date_window_max_year,
        );
        let builder = RecordBuilder::new(
            normalizer,
            settings.default_status.clone(),
            settings.default_payment_mode.clone(),
        );
        let validator = RecordValidatorImpl::new(normalizer);
        let total_rows = grid.rows.len();

        // === 步骤 1: 映射 + 构建 + 校验 ===
        debug!("步骤 1: 映射 + 构建 + 校验");
        let rows = self.collect_candidates(&grid, &builder, &validator);
        info!(
            candidates = rows.candidates.len(),
            validation_errors = rows.validation_errors.len(),
            blank_rows = rows.blank_rows,
            "候选订单构建完成"
        );

        // === 步骤 2: 查询已存在订单（失败即中止）===
        debug!("步骤 2: 查询已存在订单");
        let ids = lookup_ids(&rows.candidates);
        let existing = self
            .import_repo
            .find_existing_by_order_ids(&ids)
            .await
            .map_err(|e| {
                error!(batch_id = %batch_id, error = %e, "已存在订单查询失败");
                ImportError::ExistingLookupFailed(e.to_string())
            })?;
        debug!(lookup = ids.len(), found = existing.len(), "已存在订单查询完成");

        // === 步骤 3: 对账 ===
        let plan = self.reconciler.reconcile(rows.candidates, &existing, options);
        info!(
            updates = plan.updates.len(),
            inserts = plan.inserts.len(),
            skipped = plan.skipped(),
            "对账完成"
        );

        // === 步骤 4: 写入 ===
        let writer = BatchWriter::new(&self.import_repo, &batch_id, settings.write_concurrency);
        let skipped = plan.skipped();
        let write_report = writer.write(plan.updates, plan.inserts).await;

        // === 步骤 5: 汇总 ===
        let mut aggregator = ResultAggregator::new();
        aggregator.add_validation_errors(rows.validation_errors);
        aggregator.add_skipped(skipped, plan.error_details);
        aggregator.add_written(write_report.imported, write_report.updated);
        aggregator.add_write_errors(write_report.errors);
        let result = aggregator.finish(settings.error_detail_cap);

        // === 步骤 6: 批次台账（失败不影响导入结果）===
        let elapsed_time = start_time.elapsed();
        let config_snapshot_json = match self.config.get_config_snapshot_json().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "配置快照读取失败");
                None
            }
        };
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            file_name,
            sheet_name: grid.sheet_name.clone(),
            total_rows,
            imported: result.imported,
            updated: result.updated,
            skipped: result.skipped,
            validation_errors: result.validation_errors,
            write_errors: result.write_errors,
            options_json: serde_json::to_string(options).ok(),
            config_snapshot_json,
            imported_at: Some(Utc::now()),
            elapsed_ms: Some(elapsed_time.as_millis() as i64),
        };
        if let Err(e) = self.import_repo.insert_batch(&batch).await {
            warn!(batch_id = %batch_id, error = %e, "批次台账写入失败");
        }

        info!(
            batch_id = %batch_id,
            imported = result.imported,
            updated = result.updated,
            skipped = result.skipped,
            validation_errors = result.validation_errors,
            write_errors = result.write_errors,
            elapsed_ms = elapsed_time.as_millis(),
            "订单导入完成"
        );

        Ok(ImportReport {
            batch,
            result,
            elapsed_time,
        })
    }
}

#[async_trait::async_trait]
impl<R, C> OrderImporter for OrderImporterImpl<R, C>
where
    R: OrderImportRepository + Send + Sync,
    C: IngestConfigReader + Send + Sync,
{
    #[instrument(skip(self, file_path, options), fields(batch_id))]
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        options: &ImportOptions,
    ) -> IngestResult<ImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let path = file_path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string());
        info!(batch_id = %batch_id, file_path = %path.display(), "开始导入订单");

        // === 步骤 0: 解析文件 ===
        let grid = self.file_parser.parse_to_grid(path).map_err(|e| {
            error!(error = %e, "文件解析失败");
            e
        })?;
        info!(
            sheet = grid.sheet_name.as_deref().unwrap_or("-"),
            rows = grid.rows.len(),
            "文件解析完成"
        );

        self.run_pipeline(grid, file_name, options, batch_id, start_time)
            .await
    }

    #[instrument(skip(self, grid, options), fields(batch_id))]
    async fn import_grid(
        &self,
        grid: SheetGrid,
        file_name: Option<String>,
        options: &ImportOptions,
    ) -> IngestResult<ImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(batch_id = %batch_id, rows = grid.rows.len(), "开始导入订单网格");

        self.run_pipeline(grid, file_name, options, batch_id, start_time)
            .await
    }
}
