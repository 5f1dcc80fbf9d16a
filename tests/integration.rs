//! End-to-end tests over on-disk fixture tables: loading, archive
//! refresh over HTTP, and the API answering on a real socket.

use flate2::write::GzEncoder;
use flate2::Compression;
use geolocip::serve;
use geolocip::tables::{ASN_FILE_NAME, BLOCKS_FILE_NAME, LOCATIONS_FILE_NAME};
use geolocip::{GeoDb, TableFetcher, TableSources};
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

const LOOKUP_IP: Ipv4Addr = Ipv4Addr::new(54, 88, 55, 63);
const MONTREAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 55, 44);

/// Write the three tables the way the provider ships them: copyright
/// preamble, header row, a mix of quoted and bare fields, Latin-1 text.
fn write_tables(dir: &Path) {
    let ip = u32::from(LOOKUP_IP);

    std::fs::write(
        dir.join(BLOCKS_FILE_NAME),
        format!(
            "Copyright (c) 2012 MaxMind LLC.  All Rights Reserved.\n\
             startIpNum,endIpNum,locId\n\
             \"{}\",\"{}\",\"20147\"\n\
             3232235520,3232301055,1000\n",
            ip - 100,
            ip + 100
        ),
    )
    .unwrap();

    let mut locations: Vec<u8> = Vec::new();
    locations.extend_from_slice(
        b"locId,country,region,city,postalCode,latitude,longitude,metroCode,areaCode\n",
    );
    locations.extend_from_slice(b"20147,US,VA,Ashburn,20147,39.0335,-77.4838,511,703\n");
    locations.extend_from_slice(b"1000,CA,QC,Montr\xe9al,H2Y,45.5088,-73.5878,,\n");
    std::fs::write(dir.join(LOCATIONS_FILE_NAME), locations).unwrap();

    let mut asn: Vec<u8> = Vec::new();
    asn.extend_from_slice(
        format!("{},{},\"AS14618 Amazon.com, Inc.\"\n", ip - 1000, ip + 1000).as_bytes(),
    );
    asn.extend_from_slice(b"3232235520,3232301055,\"AS3215 France T\xe9l\xe9com\"\n");
    std::fs::write(dir.join(ASN_FILE_NAME), asn).unwrap();
}

fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        for (name, body) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Serve one canned 200 response on an ephemeral port, then quit.
fn archive_server(payload: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 512];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    request.extend_from_slice(&buf[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
            }
        }
        let header = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            payload.len()
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&payload);
    });
    addr
}

#[test]
fn test_lookup_through_on_disk_tables() {
    let dir = tempdir().unwrap();
    write_tables(dir.path());
    let db = GeoDb::load(&TableSources::in_dir(dir.path()));

    assert!(db.is_ready());
    let stats = db.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.organizations, 2);
    assert_eq!(stats.locations, 2);

    let geo = db.lookup(LOOKUP_IP).unwrap();
    assert_eq!(geo.location.as_ref().unwrap().city, "Ashburn");
    assert_eq!(geo.organization.as_deref(), Some("AS14618 Amazon.com, Inc."));
    assert_eq!(geo.country_name.as_deref(), Some("États-Unis"));
    assert_eq!(geo.region_name.as_deref(), Some("Virginia"));

    assert!(db.lookup(Ipv4Addr::new(10, 0, 0, 1)).is_none());
}

#[test]
fn test_latin1_tables_come_out_as_utf8() {
    let dir = tempdir().unwrap();
    write_tables(dir.path());
    let db = GeoDb::load(&TableSources::in_dir(dir.path()));

    let geo = db.lookup(MONTREAL_IP).unwrap();
    let value = serde_json::to_value(geo.response()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "ip": "192.168.55.44",
            "country_code": "CA",
            "region_code": "QC",
            "city": "Montréal",
            "postal_code": "H2Y",
            "latitude": 45.5088,
            "longitude": -73.5878,
            "organization": "AS3215 France Télécom",
            "country": "Canada",
            "region": "Quebec"
        })
    );
}

#[test]
fn test_malformed_rows_are_dropped_not_fatal() {
    let dir = tempdir().unwrap();
    write_tables(dir.path());

    // Append junk to every table; the good rows must survive the load.
    let append = |name: &str, junk: &str| {
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(name))
            .unwrap();
        file.write_all(junk.as_bytes()).unwrap();
    };
    append(BLOCKS_FILE_NAME, "no commas at all\n1,2\n4294967296,1,1\n");
    append(LOCATIONS_FILE_NAME, "notanid,US,VA,Nowhere,,,,,\nshort,row\n");
    append(ASN_FILE_NAME, "one,field\n");

    let db = GeoDb::load(&TableSources::in_dir(dir.path()));
    let stats = db.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.organizations, 2);
    assert_eq!(stats.locations, 2);
    assert_eq!(
        db.lookup(LOOKUP_IP).unwrap().location.unwrap().city,
        "Ashburn"
    );
}

#[test]
fn test_gzipped_tables_load_transparently() {
    let dir = tempdir().unwrap();
    write_tables(dir.path());

    // Recompress each table and drop the plain file, so only the .gz
    // variant can satisfy the load.
    let gz = |name: &str| {
        let plain = std::fs::read(dir.path().join(name)).unwrap();
        let path = dir.path().join(format!("{name}.gz"));
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(&plain).unwrap();
        enc.finish().unwrap();
        std::fs::remove_file(dir.path().join(name)).unwrap();
        path
    };
    let sources = TableSources {
        blocks: gz(BLOCKS_FILE_NAME),
        locations: gz(LOCATIONS_FILE_NAME),
        asn: gz(ASN_FILE_NAME),
    };

    let db = GeoDb::load(&sources);
    assert!(db.is_ready());
    assert_eq!(
        db.lookup(MONTREAL_IP).unwrap().location.unwrap().city,
        "Montréal"
    );
}

#[test]
fn test_refresh_downloads_extracts_and_reuses() {
    let dir = tempdir().unwrap();
    let ip = u32::from(LOOKUP_IP);

    let asn_rows = format!("{},{},\"AS14618 Amazon.com, Inc.\"\n", ip - 1000, ip + 1000);
    let blocks_rows = format!("\"{}\",\"{}\",\"20147\"\n", ip - 100, ip + 100);
    let asn_addr = archive_server(zip_bytes(&[("GeoIPASNum2.csv", asn_rows.as_bytes())]));
    let city_addr = archive_server(zip_bytes(&[
        (
            "GeoLiteCity_20130101/GeoLiteCity-Blocks.csv",
            blocks_rows.as_bytes(),
        ),
        (
            "GeoLiteCity_20130101/GeoLiteCity-Location.csv",
            b"20147,US,VA,Ashburn,20147,39.0335,-77.4838,511,703\n".as_slice(),
        ),
    ]));

    let fetcher = TableFetcher::new(dir.path()).with_urls(
        &format!("http://{asn_addr}/GeoIPASNum2.zip"),
        &format!("http://{city_addr}/GeoLiteCity-latest.zip"),
    );

    assert!(fetcher.refresh().unwrap());
    assert!(dir.path().join("GeoIPASNum2.zip").exists());
    assert!(dir.path().join("GeoLiteCity-latest.zip").exists());

    let db = GeoDb::load(&fetcher.sources());
    let geo = db.lookup(LOOKUP_IP).unwrap();
    assert_eq!(geo.location.unwrap().city, "Ashburn");
    assert_eq!(geo.organization.as_deref(), Some("AS14618 Amazon.com, Inc."));

    // Second pass finds fresh archives; the one-shot mirrors are gone by
    // now, so any download attempt would fail loudly.
    assert!(!fetcher.refresh().unwrap());
}

#[test]
fn test_refresh_repairs_a_deleted_table() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("GeoIPASNum2.zip"),
        zip_bytes(&[("GeoIPASNum2.csv", b"100,199,\"AS1 One\"\n".as_slice())]),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("GeoLiteCity-latest.zip"),
        zip_bytes(&[
            (
                "GeoLiteCity_20130101/GeoLiteCity-Blocks.csv",
                b"100,199,7\n".as_slice(),
            ),
            (
                "GeoLiteCity_20130101/GeoLiteCity-Location.csv",
                b"7,US,VA,Ashburn,,,,,\n".as_slice(),
            ),
        ]),
    )
    .unwrap();

    let fetcher = TableFetcher::new(dir.path());
    assert!(!fetcher.refresh().unwrap());
    let blocks = dir.path().join(BLOCKS_FILE_NAME);
    assert!(blocks.exists());

    std::fs::remove_file(&blocks).unwrap();
    assert!(!fetcher.refresh().unwrap());
    assert!(blocks.exists());
}

#[test]
fn test_api_answers_on_a_real_socket() {
    let dir = tempdir().unwrap();
    write_tables(dir.path());
    let db = Arc::new(GeoDb::load(&TableSources::in_dir(dir.path())));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let app = serve::router(db).into_make_service_with_connect_info::<SocketAddr>();
    std::thread::spawn(move || {
        rt.block_on(async move {
            axum::serve(listener, app).await.unwrap();
        });
    });

    let body = ureq::get(&format!("http://{addr}/54.88.55.63"))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["ip"], "54.88.55.63");
    assert_eq!(json["city"], "Ashburn");
    assert_eq!(json["organization"], "AS14618 Amazon.com, Inc.");

    match ureq::get(&format!("http://{addr}/10.9.8.7")).call() {
        Err(ureq::Error::Status(status, response)) => {
            assert_eq!(status, 404);
            let json: serde_json::Value =
                serde_json::from_str(&response.into_string().unwrap()).unwrap();
            assert!(json["error"].as_str().unwrap().contains("10.9.8.7"));
        }
        other => panic!("expected a 404 status, got {:?}", other),
    }
}
