use std::fmt;
use std::io::{self, Write};

/// One snapshot of the optimizer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosticRecord {
	pub iteration: usize,
	pub filling_error: f32,
	pub size_affinity: f32,
	pub neighbor_affinity: f32,
	pub grains: usize,
	pub accepted_moves: usize,
}

impl fmt::Display for DiagnosticRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} {} {} {} {} {}",
			self.iteration,
			self.filling_error,
			self.size_affinity,
			self.neighbor_affinity,
			self.grains,
			self.accepted_moves
		)
	}
}

/// Records kept in memory and optionally streamed to a writer, one line each.
#[derive(Default)]
pub struct DiagnosticLog {
	pub records: Vec<DiagnosticRecord>,
	sink: Option<Box<dyn Write>>,
}

impl DiagnosticLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_sink(sink: Box<dyn Write>) -> Self {
		Self { records: Vec::new(), sink: Some(sink) }
	}

	pub fn record(&mut self, record: DiagnosticRecord) -> io::Result<()> {
		if let Some(sink) = self.sink.as_mut() {
			writeln!(sink, "{}", record)?;
		}
		self.records.push(record);
		Ok(())
	}

	pub fn flush(&mut self) -> io::Result<()> {
		match self.sink.as_mut() {
			Some(sink) => sink.flush(),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn record_line_has_six_columns() {
		let record = DiagnosticRecord {
			iteration: 25,
			filling_error: 0.5,
			size_affinity: 0.75,
			neighbor_affinity: 2.0,
			grains: 12,
			accepted_moves: 7,
		};
		assert_eq!(record.to_string(), "25 0.5 0.75 2 12 7");
	}

	#[test]
	fn records_are_kept_without_a_sink() {
		let mut log = DiagnosticLog::new();
		let record = DiagnosticRecord {
			iteration: 0,
			filling_error: 1.0,
			size_affinity: 0.0,
			neighbor_affinity: 0.0,
			grains: 1,
			accepted_moves: 0,
		};
		log.record(record).unwrap();
		log.flush().unwrap();
		assert_eq!(log.records, vec![record]);
	}
}
