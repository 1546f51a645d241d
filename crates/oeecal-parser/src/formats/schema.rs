//! Column offsets of the two spreadsheet exports. The exports carry decorative
//! header rows whose labels are not reliable, so columns are addressed by position.
//! If the factory system changes its export, this is the file to edit.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OeeTableLayout {
    pub header_rows: usize,
    pub machine: usize,
    pub date: usize,
    pub shift: usize,
    pub hour: usize,
    pub availability: usize,
    pub performance: usize,
    pub quality: usize,
    pub teep: usize,
    pub oee: usize,
}

impl OeeTableLayout {
    pub const fn min_columns(&self) -> usize {
        widest(&[
            self.machine,
            self.date,
            self.shift,
            self.hour,
            self.availability,
            self.performance,
            self.quality,
            self.teep,
            self.oee,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoppageLogLayout {
    pub header_rows: usize,
    pub machine: usize,
    pub date: usize,
    pub hour: usize,
    pub category: usize,
    pub duration_secs: usize,
}

impl StoppageLogLayout {
    pub const fn min_columns(&self) -> usize {
        widest(&[
            self.machine,
            self.date,
            self.hour,
            self.category,
            self.duration_secs,
        ])
    }
}

pub const OEE_TABLE_LAYOUT: OeeTableLayout = OeeTableLayout {
    header_rows: 2,
    machine: 1,
    date: 2,
    shift: 3,
    hour: 4,
    availability: 7,
    performance: 8,
    quality: 9,
    teep: 10,
    oee: 11,
};

pub const STOPPAGE_LOG_LAYOUT: StoppageLogLayout = StoppageLogLayout {
    header_rows: 3,
    machine: 1,
    date: 2,
    hour: 5,
    category: 7,
    duration_secs: 12,
};

const fn widest(offsets: &[usize]) -> usize {
    let mut max = 0;
    let mut idx = 0;
    while idx < offsets.len() {
        if offsets[idx] > max {
            max = offsets[idx];
        }
        idx += 1;
    }
    max + 1
}
