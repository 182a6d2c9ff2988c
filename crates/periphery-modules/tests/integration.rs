//! Integration tests for periphery-modules.
//!
//! Exercises the collaborator aggregates through the registry the way a
//! parameter file or preset would: by name, through module lists.

use std::cell::Cell;
use std::fs;
use std::rc::Rc;

use periphery_core::{
    ListProvider, MAX_ELEMENTS, OwnerKind, ParList, ParamError, ParamOwner, apply_text, find,
    render_to_string, set_by_index, set_param,
};
use periphery_modules::{
    Compression, Ear, FreqList, FreqListNode, Gammatone, HHuxley, IonChannelList,
    IonChannelListNode, Module, NullModule, ParamArray, ParamArrayNode, ParamArraySpec, Script,
    Simulation, Spacing, Stimulus,
};

const CHANNELS: usize = 5;

#[test]
fn linear_channel_change_regenerates_on_validate() {
    let node = FreqListNode::new(FreqList::new(Spacing::Linear, 4, 100.0, 1000.0)).unwrap();
    node.validate().unwrap();
    set_by_index(node.spacing_list(), CHANNELS, "6").unwrap();
    assert!(node.spacing_list().borrow().is_dirty());

    node.validate().unwrap();
    assert!(!node.spacing_list().borrow().is_dirty());
    let data = node.data().borrow();
    let f = data.frequencies();
    assert_eq!(f.len(), 6);
    assert_eq!(f[0], 100.0);
    assert_eq!(f[5], 1000.0);
    for pair in f.windows(2) {
        assert!((pair[1] - pair[0] - 180.0).abs() < 1e-9, "{f:?}");
    }
}

#[test]
fn frequency_list_writes_mark_dirty_and_failures_keep_it() {
    let node = FreqListNode::new(FreqList::new(Spacing::Log, 4, 100.0, 1000.0)).unwrap();
    node.validate().unwrap();
    for (name, value) in [("CF_MODE", "erb"), ("MAX_CF", "2000"), ("B_MODE", "scaled_erb")] {
        let field = find(node.spacing_list(), name)
            .unwrap()
            .or(find(node.bandwidth_list(), name).unwrap())
            .unwrap();
        field.set(value).unwrap();
        assert!(node.data().borrow().is_dirty(), "{name}");
        node.validate().unwrap();
        assert!(!node.data().borrow().is_dirty(), "{name}");
    }

    set_param(node.spacing_list(), "MIN_CF", "5000").unwrap();
    let err = node.validate().unwrap_err();
    assert_eq!(err.class(), periphery_core::ErrorClass::Consistency);
    assert!(node.data().borrow().is_dirty());
    assert!(node.validate().is_err());

    set_param(node.spacing_list(), "MIN_CF", "500").unwrap();
    node.validate().unwrap();
    assert!(!node.data().borrow().is_dirty());
}

#[test]
fn description_resolves_to_first_matching_element() {
    let node = IonChannelListNode::new(IonChannelList::new(2)).unwrap();
    let root: Rc<dyn ListProvider> = node.clone();
    let lists = root.sub_lists().unwrap();
    assert_eq!(lists.len(), 3);

    let found = find(&lists[1].list, "DESCRIPTION").unwrap().unwrap();
    assert_eq!(found.meta().unwrap().owner_kind, OwnerKind::IonChannel);

    let neuron = HHuxley::with_channels(IonChannelList::new(2)).unwrap();
    let list = neuron.par_list().unwrap();
    let channels = neuron.params().borrow().channels().clone();
    let descriptions = || -> Vec<String> {
        channels
            .data()
            .borrow()
            .elements()
            .iter()
            .map(|e| e.borrow().description().to_string())
            .collect()
    };

    set_param(&list, "DESCRIPTION", "\"sodium\"").unwrap();
    assert_eq!(descriptions(), ["sodium", ""]);

    set_param(&list, "DESCRIPTION", "potassium").unwrap();
    assert_eq!(descriptions(), ["sodium", "potassium"]);

    // A repeated description finds its own channel again.
    set_param(&list, "DESCRIPTION", "potassium").unwrap();
    assert_eq!(descriptions(), ["sodium", "potassium"]);

    assert!(matches!(
        set_param(&list, "DESCRIPTION", "calcium"),
        Err(ParamError::UnknownField(_))
    ));
    assert_eq!(descriptions(), ["sodium", "potassium"]);

    // Lookup by name alone still stops at the first channel.
    let first = find(&list, "DESCRIPTION").unwrap().unwrap();
    assert_eq!(
        first.value().unwrap(),
        periphery_core::Rendered::Scalar("\"sodium\"".to_string())
    );
}

#[test]
fn positional_channel_file_fills_channels_in_order() {
    let neuron = HHuxley::with_channels(IonChannelList::new(2)).unwrap();
    let list = neuron.par_list().unwrap();
    apply_text(&list, "DESCRIPTION sodium\nDESCRIPTION potassium\n").unwrap();
    neuron.validate().unwrap();
    let channels = neuron.params().borrow().channels().clone();
    let data = channels.data().borrow();
    assert_eq!(data.elements()[0].borrow().description(), "sodium");
    assert_eq!(data.elements()[1].borrow().description(), "potassium");
}

#[test]
fn qualified_description_reaches_the_second_element() {
    let neuron = HHuxley::new().unwrap();
    let list = neuron.par_list().unwrap();
    set_param(&list, "DESCRIPTION.0", "sodium").unwrap();
    set_param(&list, "DESCRIPTION.1", "potassium").unwrap();
    let channels = neuron.params().borrow().channels().clone();
    let data = channels.data().borrow();
    assert_eq!(data.elements()[1].borrow().description(), "potassium");
    assert!(matches!(
        set_param(&list, "DESCRIPTION.2", "x"),
        Err(ParamError::UnknownField(_))
    ));
}

#[test]
fn own_gain_beats_nested_gain() {
    let ear = Ear::new().unwrap();
    let list = ear.par_list().unwrap();
    let own = find(&list, "GAIN").unwrap().unwrap();
    assert!(Rc::ptr_eq(&own.list, &list));

    let bm = ear.params().borrow().bm().par_list().unwrap();
    let nested = find(&list, "GAIN.BM").unwrap().unwrap();
    assert!(Rc::ptr_eq(&nested.list, &bm));
    assert_eq!(nested.index, 1);
}

#[test]
fn module_lists_round_trip_through_text() {
    let neuron = HHuxley::new().unwrap();
    let list = neuron.par_list().unwrap();
    apply_text(
        &list,
        "DEBUG on\n\
         CAPACITANCE 2.5e-12\n\
         TEMPERATURE 37\n\
         CHANNEL_MODE.1 boltzmann\n\
         V_HALF.1 -0.031\n\
         ALPHA.0 1:-0.05\n",
    )
    .unwrap();
    neuron.validate().unwrap();
    let text = render_to_string(&list).unwrap();

    let copy = HHuxley::new().unwrap();
    let copy_list = copy.par_list().unwrap();
    apply_text(&copy_list, &text).unwrap();
    copy.validate().unwrap();
    assert_eq!(render_to_string(&copy_list).unwrap(), text);
    assert!(text.contains("V_HALF.1\t-0.031\t"), "{text}");
    assert!(!text.contains("V_HALF.0"), "{text}");
}

#[test]
fn stimulus_rejects_out_of_range_fixed_index() {
    let stimulus = Stimulus::new().unwrap();
    let list = stimulus.par_list().unwrap();
    set_param(&list, "NUM_TONES", "5").unwrap();
    set_param(&list, "LEVELS:2", "3.5").unwrap();
    assert_eq!(stimulus.params().borrow().levels(), &[60.0, 0.0, 3.5, 0.0, 0.0]);

    set_param(&list, "NUM_TONES", "2").unwrap();
    let err = set_param(&list, "LEVELS:2", "3.5").unwrap_err();
    assert!(matches!(err, ParamError::IndexOutOfRange { .. }), "{err}");
    assert_eq!(stimulus.params().borrow().levels(), &[60.0, 0.0]);
}

#[test]
fn parameter_array_hook_sees_the_new_values() {
    static GAINS: ParamArraySpec = ParamArraySpec {
        mode_field: "SHAPE",
        param_field: "COEFFS",
        mode_description: "Shape.",
        param_description: "Coefficients.",
        modes: &["one", "two"],
        param_counts: &[1, 2],
    };
    let last = Rc::new(Cell::new(0.0));
    let seen = last.clone();
    let array = ParamArray::new(&GAINS, "two", &[])
        .unwrap()
        .with_write_hook(Rc::new(move |a: &ParamArray| seen.set(a.params().iter().sum())));
    let node = ParamArrayNode::new(array).unwrap();
    set_param(node.list(), "COEFFS", "0:1.5").unwrap();
    set_param(node.list(), "COEFFS", "1:2").unwrap();
    assert_eq!(last.get(), 3.5);
}

#[test]
fn compression_revision_counts_law_writes_only() {
    let c = Compression::new().unwrap();
    let list = c.par_list().unwrap();
    apply_text(&list, "OUTPUT_GAIN 6\nLAW broken_stick\nLAW_PARAM 0:0.01\n").unwrap();
    assert_eq!(c.revision(), 2);
    c.validate().unwrap();
}

#[test]
fn simulation_script_names_and_render() {
    let mut script = Script::new();
    script.push("stim", Some(Box::new(Stimulus::new().unwrap()))).unwrap();
    script.push("pass", Some(Box::new(NullModule))).unwrap();
    script.push("bm", Some(Box::new(Gammatone::new().unwrap()))).unwrap();
    let sim = Simulation::new(script).unwrap();
    let list = sim.par_list().unwrap();

    set_param(&list, "TITLE", "\"tone in quiet\"").unwrap();
    set_param(&list, "FREQUENCIES.stim:3", "4000").unwrap();
    set_param(&list, "CHANNELS.bm", "12").unwrap();
    sim.validate().unwrap();

    let text = render_to_string(&list).unwrap();
    assert!(text.starts_with("TITLE\t\"tone in quiet\"\t# Simulation title.\n"), "{text}");
    assert!(text.contains("\n# Simulation script\n"), "{text}");
    assert!(text.contains("FREQUENCIES.stim:3\t4000\t"), "{text}");
    assert!(text.contains("CHANNELS.bm\t12\t"), "{text}");
}

#[test]
fn table_file_channel_reads_rows() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("kfast.tab"),
        "# voltage activation tau\n-0.1 0.0 0.002\n\n-0.05 0.5 0.001 # half\n0.0 1.0 0.0005\n",
    )
    .unwrap();
    let neuron = HHuxley::with_channels(IonChannelList::new(1)).unwrap();
    let list = neuron.par_list().unwrap();
    set_param(&list, "BASE_DIR", &format!("\"{}\"", dir.path().display())).unwrap();
    set_param(&list, "CHANNEL_MODE", "kfast.tab").unwrap();
    neuron.validate().unwrap();

    let channels = neuron.params().borrow().channels().clone();
    let element = channels.data().borrow().elements()[0].clone();
    let element = element.borrow();
    assert_eq!(element.table().len(), 3);
    assert_eq!(element.table()[1].activation, 0.5);
}

#[test]
fn huge_dynamic_array_index_is_refused() {
    let stimulus = Stimulus::new().unwrap();
    let list = stimulus.par_list().unwrap();
    for index in [usize::MAX, MAX_ELEMENTS] {
        let err = set_param(&list, &format!("FREQUENCIES:{index}"), "1.0").unwrap_err();
        assert!(
            matches!(err, ParamError::IndexOutOfRange { index: i, .. } if i == index),
            "{err}"
        );
    }
    assert_eq!(stimulus.params().borrow().frequencies(), [1000.0]);

    set_param(&list, "FREQUENCIES:3", "4000").unwrap();
    assert_eq!(stimulus.params().borrow().frequencies(), [1000.0, 0.0, 0.0, 4000.0]);
}

#[test]
fn oversized_frequency_lists_fail_validation() {
    let node = FreqListNode::new(FreqList::new(Spacing::Linear, 4, 100.0, 1000.0)).unwrap();
    set_param(node.spacing_list(), "CHANNELS", "2147483647").unwrap();
    assert!(matches!(node.validate(), Err(ParamError::Allocation { .. })));
    assert!(node.data().borrow().is_dirty());

    set_param(node.spacing_list(), "CHANNELS", "8").unwrap();
    node.validate().unwrap();
    assert_eq!(node.data().borrow().channel_count(), 8);

    set_param(node.spacing_list(), "CF_MODE", "erb_n").unwrap();
    set_param(node.spacing_list(), "ERB_DENSITY", "1e308").unwrap();
    let err = node.validate().unwrap_err();
    assert!(matches!(err, ParamError::Inconsistent { owner: OwnerKind::FreqList, .. }), "{err}");
    assert!(node.data().borrow().is_dirty());
}

#[test]
fn oversized_voltage_grid_fails_validation() {
    let node = IonChannelListNode::new(IonChannelList::new(2)).unwrap();
    node.validate().unwrap();
    set_param(node.general_list(), "V_STEP", "1e-300").unwrap();
    let err = node.validate().unwrap_err();
    assert!(
        matches!(err, ParamError::Inconsistent { owner: OwnerKind::IonChannelList, .. }),
        "{err}"
    );
    assert!(node.data().borrow().grid().points().is_err());
}
