#![allow(dead_code)]

/// Builds dBase III tables in memory so tests do not need fixture files.
pub struct DbfBuilder {
    fields: Vec<(String, u8, u8, u8)>,
    records: Vec<(u8, Vec<Vec<u8>>)>,
    encoding: &'static encoding_rs::Encoding,
}

impl DbfBuilder {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            records: Vec::new(),
            encoding: encoding_rs::WINDOWS_1252,
        }
    }

    /// Code page the text values are written in.
    pub fn encoding(mut self, encoding: &'static encoding_rs::Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn character(mut self, name: &str, length: u8) -> Self {
        self.fields.push((name.to_string(), b'C', length, 0));
        self
    }

    pub fn numeric(mut self, name: &str, length: u8, decimals: u8) -> Self {
        self.fields.push((name.to_string(), b'N', length, decimals));
        self
    }

    pub fn float(mut self, name: &str, length: u8, decimals: u8) -> Self {
        self.fields.push((name.to_string(), b'F', length, decimals));
        self
    }

    pub fn logical(mut self, name: &str) -> Self {
        self.fields.push((name.to_string(), b'L', 1, 0));
        self
    }

    pub fn date(mut self, name: &str) -> Self {
        self.fields.push((name.to_string(), b'D', 8, 0));
        self
    }

    /// One value per field. Character values are left aligned, everything
    /// else right aligned.
    pub fn record(self, values: &[&str]) -> Self {
        self.flagged(b' ', values)
    }

    /// A record carrying the `*` deletion mark.
    pub fn deleted(self, values: &[&str]) -> Self {
        self.flagged(b'*', values)
    }

    fn flagged(mut self, flag: u8, values: &[&str]) -> Self {
        assert_eq!(values.len(), self.fields.len(), "one value per field");
        let cells = values
            .iter()
            .map(|v| self.encoding.encode(v).0.into_owned())
            .collect();
        self.records.push((flag, cells));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let record_len: usize = 1 + self.fields.iter().map(|f| f.2 as usize).sum::<usize>();
        let header_len = 32 + 32 * self.fields.len() + 1;

        let mut out = Vec::new();
        out.push(0x03);
        out.extend_from_slice(&[124, 1, 15]);
        out.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        out.extend_from_slice(&(header_len as u16).to_le_bytes());
        out.extend_from_slice(&(record_len as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);

        for (name, kind, length, decimals) in &self.fields {
            let mut descriptor = [0u8; 32];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = *kind;
            descriptor[16] = *length;
            descriptor[17] = *decimals;
            out.extend_from_slice(&descriptor);
        }
        out.push(0x0D);

        for (flag, record) in &self.records {
            out.push(*flag);
            for ((_, kind, length, _), value) in self.fields.iter().zip(record) {
                let length = *length as usize;
                assert!(value.len() <= length, "value wider than its field");
                let padding = vec![b' '; length - value.len()];
                if *kind == b'C' {
                    out.extend_from_slice(value);
                    out.extend_from_slice(&padding);
                } else {
                    out.extend_from_slice(&padding);
                    out.extend_from_slice(value);
                }
            }
        }
        out.push(0x1A);
        out
    }
}

/// Three products with mixed-case legacy column names.
pub fn stock_table() -> Vec<u8> {
    DbfBuilder::new()
        .character("stcodigo", 10)
        .character("STDESCRIP", 30)
        .numeric("StPrecUni2", 12, 2)
        .character("STFAMILIA", 20)
        .record(&["A001", "Caño de cobre", "150.00", "Plomeria"])
        .record(&["A002", "Tuerca \"M8\"", "12.50", "Fijaciones"])
        .record(&["A003", "Llave inglesa", "1299.9", ""])
        .build()
}
