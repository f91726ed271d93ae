//! Helpers shared by this crate's tests.

use std::io::{Cursor, Write};
use std::time::Duration;

use zip::write::SimpleFileOptions;

use crate::{DartClient, DartSettings};

pub(crate) const API_KEY: &str = "test-key";

pub(crate) fn client_for(server: &wiremock::MockServer) -> DartClient {
    DartClient::new(DartSettings {
        api_key: API_KEY.into(),
        base_url: server.uri(),
        category_code: "A".into(),
        page_count: 10,
        max_pages: 3,
        timeout: Duration::from_secs(5),
    })
    .expect("client builds")
}

/// Build an in-memory zip holding `entries` in order.
pub(crate) fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        for (name, body) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(body).expect("write zip entry");
        }
        writer.finish().expect("finish zip");
    }
    buf.into_inner()
}
