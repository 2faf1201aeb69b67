use assert_matches::assert_matches;

use kira_align::domain::{Destination, ReadSet, SampleName, Source};
use kira_align::error::KiraError;

#[test]
fn read_set_keeps_order() {
    let reads: ReadSet = "/a.fastq+s3://bucket/b.fastq+sra://srr000001"
        .parse()
        .unwrap();
    assert_eq!(reads.len(), 3);
    assert_matches!(reads.sources()[0], Source::Local(_));
    assert_matches!(reads.sources()[1], Source::ObjectStore(_));
    assert_matches!(reads.sources()[2], Source::Archive(_));
    assert_eq!(
        reads.joined(),
        "/a.fastq+s3://bucket/b.fastq+sra://SRR000001"
    );
}

#[test]
fn duplicate_uris_are_rejected() {
    let err = "/a.fastq+/a.fastq".parse::<ReadSet>().unwrap_err();
    assert_matches!(err, KiraError::Validation(_));
}

#[test]
fn duplicate_file_names_are_rejected() {
    let err = "/x/a.fastq+s3://bucket/a.fastq".parse::<ReadSet>().unwrap_err();
    assert_matches!(err, KiraError::Validation(_));

    let err = "sra://SRR1+sra://srr1".parse::<ReadSet>().unwrap_err();
    assert_matches!(err, KiraError::Validation(_));
}

#[test]
fn illegal_characters_are_rejected() {
    assert_matches!(
        "/a.fastq+".parse::<ReadSet>(),
        Err(KiraError::Validation(_))
    );
    assert_matches!(
        "/my reads.fastq".parse::<ReadSet>(),
        Err(KiraError::Validation(_))
    );
}

#[test]
fn sample_names_must_be_file_names() {
    assert!("sample_1".parse::<SampleName>().is_ok());
    assert_matches!("a/b".parse::<SampleName>(), Err(KiraError::Validation(_)));
    assert_matches!("".parse::<SampleName>(), Err(KiraError::Validation(_)));
}

#[test]
fn destinations() {
    assert_matches!("/results".parse::<Destination>(), Ok(Destination::Local(_)));
    assert_matches!(
        "ftp://host/results".parse::<Destination>(),
        Err(KiraError::UnsupportedScheme(_))
    );
}
