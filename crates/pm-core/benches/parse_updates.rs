//! Criterion benchmarks for hot-path update parsers in `pm-core`.
//!
//! These benchmarks run entirely on synthetic package-manager output so
//! they are deterministic in CI and never shell out to a real manager.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pm_core::collect::apt::{parse_security_packages, parse_upgradable};
use pm_core::collect::dnf::{parse_check_update, parse_security_list};
use pm_core::collect::pacman::parse_upgrades;
use pm_core::collect::zypper::parse_list_updates;

fn apt_upgradable(packages: usize) -> String {
    let mut out = String::from("Listing... Done\n");
    for i in 0..packages {
        out.push_str(&format!(
            "pkg{i}/jammy-updates 2.{i}.0-1ubuntu1 amd64 [upgradable from: 2.{i}.0-0ubuntu1]\n"
        ));
    }
    out
}

fn apt_just_print(packages: usize) -> String {
    let mut out = String::new();
    for i in 0..packages {
        let pocket = if i % 3 == 0 {
            "Ubuntu:22.04/jammy-security"
        } else {
            "Ubuntu:22.04/jammy"
        };
        out.push_str(&format!(
            "Inst pkg{i} [2.{i}.0-0ubuntu1] (2.{i}.0-1ubuntu1 {pocket} [amd64])\n"
        ));
        out.push_str(&format!(
            "Conf pkg{i} (2.{i}.0-1ubuntu1 {pocket} [amd64])\n"
        ));
    }
    out
}

fn dnf_check_update(packages: usize) -> String {
    let mut out = String::from("Last metadata expiration check: 0:41:22 ago.\n\n");
    for i in 0..packages {
        out.push_str(&format!(
            "pkg{i}.x86_64    1.{i}.0-1.el9    baseos\n"
        ));
    }
    out
}

fn dnf_security_list(packages: usize) -> String {
    let mut out = String::from("Last metadata expiration check: 0:41:22 ago.\n");
    for i in 0..packages {
        out.push_str(&format!(
            "RHSA-2024:{i:04} Important/Sec. pkg{i}-1.{i}.0-1.el9.x86_64\n"
        ));
    }
    out
}

fn zypper_list(packages: usize) -> String {
    let mut out = String::from(
        "S | Repository | Name | Current Version | Available Version | Arch\n\
         --+------------+------+-----------------+-------------------+------\n",
    );
    for i in 0..packages {
        out.push_str(&format!(
            "v | Update Repo | pkg{i} | 1.{i}.0-1.1 | 1.{i}.1-1.1 | x86_64\n"
        ));
    }
    out
}

fn pacman_qu(packages: usize) -> String {
    let mut out = String::new();
    for i in 0..packages {
        out.push_str(&format!("pkg{i} 1.{i}.0-1 -> 1.{i}.1-1\n"));
    }
    out
}

fn bench_enumeration_parsers(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_updates");

    for size in [10usize, 500] {
        let apt = apt_upgradable(size);
        group.bench_with_input(
            BenchmarkId::new("apt_upgradable", size),
            &apt,
            |b, input| {
                b.iter(|| black_box(parse_upgradable(black_box(input))));
            },
        );

        let dnf = dnf_check_update(size);
        group.bench_with_input(
            BenchmarkId::new("dnf_check_update", size),
            &dnf,
            |b, input| {
                b.iter(|| black_box(parse_check_update(black_box(input))));
            },
        );

        let zypper = zypper_list(size);
        group.bench_with_input(
            BenchmarkId::new("zypper_list_updates", size),
            &zypper,
            |b, input| {
                b.iter(|| black_box(parse_list_updates(black_box(input))));
            },
        );

        let pacman = pacman_qu(size);
        group.bench_with_input(
            BenchmarkId::new("pacman_upgrades", size),
            &pacman,
            |b, input| {
                b.iter(|| black_box(parse_upgrades(black_box(input))));
            },
        );
    }

    group.finish();
}

fn bench_security_parsers(c: &mut Criterion) {
    let apt = apt_just_print(500);
    c.bench_function("parse_updates/apt_security_packages", |b| {
        b.iter(|| black_box(parse_security_packages(black_box(&apt))));
    });

    let dnf = dnf_security_list(500);
    c.bench_function("parse_updates/dnf_security_list", |b| {
        b.iter(|| black_box(parse_security_list(black_box(&dnf))));
    });
}

criterion_group!(benches, bench_enumeration_parsers, bench_security_parsers);
criterion_main!(benches);
