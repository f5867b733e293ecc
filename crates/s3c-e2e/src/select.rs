use anyhow::{Result, ensure};
use bytes::Bytes;

use s3c::args::{PutObjectArgs, SelectObjectContentArgs};
use s3c::select::{CsvInputSerialization, CsvOutputSerialization, FileHeaderInfo, QuoteFields, SelectEvent, SelectRequest};

use crate::utils;

const CSV: &str = "Year,Make,Model,Description,Price\n\
                   1997,Ford,E350,\"ac, abs, moon\",3000.00\n\
                   1999,Chevy,\"Venture \"\"Extended Edition\"\"\",,4900.00\n\
                   1999,Chevy,\"Venture \"\"Extended Edition, Very Large\"\"\",,5000.00\n\
                   1996,Jeep,Grand Cherokee,\"MUST SELL! air, moon roof, loaded\",4799.00\n";

/// SELECT * over a CSV with a header row returns the four data rows.
pub async fn select_csv(client: &s3c::Client) -> Result<()> {
    let bucket = utils::unique_bucket("s3c-e2e-select");
    utils::ensure_bucket(client, &bucket).await?;

    let result = async {
        let body = Bytes::from_static(CSV.as_bytes());
        let mut reader = &body[..];
        client
            .put_object(PutObjectArgs::new(&bucket, "cars.csv", Some(body.len() as u64)), &mut reader)
            .await?;

        let request = SelectRequest::new_csv(
            "select * from S3Object",
            CsvInputSerialization {
                file_header_info: Some(FileHeaderInfo::Use),
                ..CsvInputSerialization::default()
            },
            CsvOutputSerialization {
                quote_fields: Some(QuoteFields::AsNeeded),
                ..CsvOutputSerialization::default()
            },
        );

        let mut records = Vec::new();
        let mut on_event = |event: SelectEvent| {
            if let SelectEvent::Records(data) = event {
                records.extend_from_slice(&data);
            }
            true
        };
        client
            .select_object_content(SelectObjectContentArgs::new(&bucket, "cars.csv", request), &mut on_event)
            .await?;

        let expected: String = CSV.lines().skip(1).map(|l| format!("{l}\n")).collect();
        let got = String::from_utf8(records)?;
        ensure!(got == expected, "records mismatch:\nexpected: {expected}\ngot: {got}");
        Ok(())
    }
    .await;

    utils::cleanup_bucket(client, &bucket).await;
    result
}
