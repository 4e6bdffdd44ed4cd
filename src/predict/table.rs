use anyhow::Result;

/// One table row: the tile's grid position plus a score per class
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub row: u32,
    pub col: u32,
    pub scores: Vec<f32>,
}

/// Ordered prediction results for one mosaic
///
/// Rows are row-major over the tile grid: for flat index `i`,
/// `row = i / ncols` and `col = i % ncols`, so spatial location is
/// recoverable from table position alone.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    header: Vec<String>,
    rows: Vec<PredictionRow>,
}

impl ResultsTable {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Score column names, without the leading `row`/`col` index columns
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: u32, col: u32, scores: Vec<f32>) {
        self.rows.push(PredictionRow { row, col, scores });
    }

    /// Serialize as tab-separated values, schema `row col <classes...>`
    pub fn to_tsv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());

        let mut header = vec!["row".to_string(), "col".to_string()];
        header.extend(self.header.iter().cloned());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.row.to_string(), row.col.to_string()];
            record.extend(row.scores.iter().map(|s| s.to_string()));
            writer.write_record(&record)?;
        }

        Ok(writer.into_inner()?)
    }
}
