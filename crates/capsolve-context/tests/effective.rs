mod support;

use anyhow::Result;
use capsolve_context::RunConfig;
use capsolve_core::namespace::{EFFECTIVE_DIRECTIVE, PACKAGE};
use capsolve_core::{CapReqBuilder, HostedCapability, Requirement, ResolveContext};

use support::*;

fn effective_req(namespace: &str, effective: Option<&str>) -> Requirement {
    let builder = CapReqBuilder::new(namespace).filter(format!("({namespace}=*)"));
    let builder = match effective {
        Some(value) => builder.directive(EFFECTIVE_DIRECTIVE, value),
        None => builder,
    };
    builder.build_requirement()
}

fn with_effective(effective: Option<&str>) -> RunConfig {
    RunConfig {
        effective: effective.map(str::to_string),
        ..RunConfig::default()
    }
}

#[test]
fn resolve_time_requirements_are_always_effective() -> Result<()> {
    let context = context(with_effective(None), &[]);
    assert!(context.is_effective(&effective_req(PACKAGE, None))?);
    assert!(context.is_effective(&effective_req(PACKAGE, Some("resolve")))?);
    assert!(!context.is_effective(&effective_req(PACKAGE, Some("active")))?);
    Ok(())
}

#[test]
fn configured_effective_values_are_accepted() -> Result<()> {
    let context = context(with_effective(Some("active, arbitrary")), &[]);
    assert!(context.is_effective(&effective_req(PACKAGE, Some("active")))?);
    assert!(context.is_effective(&effective_req(PACKAGE, Some("arbitrary")))?);
    assert!(!context.is_effective(&effective_req(PACKAGE, Some("other")))?);
    assert!(context.is_effective(&effective_req(PACKAGE, None))?);
    Ok(())
}

#[test]
fn skip_directive_excludes_namespaces() -> Result<()> {
    let context = context(
        with_effective(Some(r#"active;skip:="osgi.service,osgi.extender""#)),
        &[],
    );
    assert!(context.is_effective(&effective_req(PACKAGE, Some("active")))?);
    assert!(!context.is_effective(&effective_req("osgi.service", Some("active")))?);
    assert!(!context.is_effective(&effective_req("osgi.extender", Some("active")))?);
    assert!(context.is_effective(&effective_req("osgi.service", Some("resolve")))?);
    Ok(())
}

#[test]
fn no_wirings_and_no_optional_resources() -> Result<()> {
    let context = context(RunConfig::default(), &[]);
    assert!(context.wirings().is_empty());
    assert!(context.optional_resources()?.is_empty());
    Ok(())
}

/// Two repositories so that the first resource gets priority 0 and the
/// second priority 1.
fn prioritized() -> Result<(capsolve_context::ResolutionContext, Vec<capsolve_core::Capability>)> {
    let first = bundle("first", v(1, 0, 0), &[("com.x", v(1, 0, 0))]);
    let second = bundle("second", v(1, 0, 0), &[("com.x", v(1, 0, 0))]);
    let context = context(
        RunConfig::default(),
        &[repo("R1", vec![first]), repo("R2", vec![second])],
    );
    let providers = context.find_providers(&package_req("com.x"))?;
    assert_eq!(providers.len(), 2);
    Ok((context, providers))
}

fn hosted_by(host: &capsolve_core::Resource) -> HostedCapability {
    let declared = bundle("fragment", v(1, 0, 0), &[("com.x", v(1, 0, 0))])
        .capabilities(Some(PACKAGE))
        .remove(0);
    HostedCapability::new(host.clone(), declared)
}

#[test]
fn hosted_capability_goes_after_equal_priorities() -> Result<()> {
    let (context, mut providers) = prioritized()?;
    let host = providers[0].resource().clone();
    let hosted = hosted_by(&host);

    let index = context.insert_hosted_capability(&mut providers, &hosted);
    assert_eq!(index, 1);
    assert_eq!(providers.len(), 3);
    assert_eq!(providers[1].resource(), &host);
    assert_eq!(providers[1].namespace(), PACKAGE);
    Ok(())
}

#[test]
fn hosted_capability_of_unknown_host_goes_last() -> Result<()> {
    let (context, mut providers) = prioritized()?;
    let stranger = bundle("stranger", v(1, 0, 0), &[]);

    let index = context.insert_hosted_capability(&mut providers, &hosted_by(&stranger));
    assert_eq!(index, 2);
    assert_eq!(providers[2].resource(), &stranger);
    Ok(())
}

#[test]
fn unranked_capabilities_count_as_highest_priority() -> Result<()> {
    let (context, providers) = prioritized()?;
    let unranked = bundle("unranked", v(1, 0, 0), &[("com.x", v(1, 0, 0))])
        .capabilities(Some(PACKAGE));
    let second = providers[1].clone();
    let first_host = providers[0].resource().clone();

    let mut list = vec![unranked[0].clone(), second];
    let index = context.insert_hosted_capability(&mut list, &hosted_by(&first_host));
    assert_eq!(index, 1);

    let mut empty = Vec::new();
    assert_eq!(context.insert_hosted_capability(&mut empty, &hosted_by(&first_host)), 0);
    assert_eq!(empty.len(), 1);
    Ok(())
}
